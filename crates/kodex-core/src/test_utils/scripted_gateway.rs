use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::errors::GatewayError;
use crate::gateway::{Gateway, GatewayRequest, GatewayResponse};

/// In-process `Gateway` that replays scripted replies in order and records
/// every request it receives.
#[derive(Clone)]
pub struct ScriptedGateway {
    replies: Arc<Mutex<VecDeque<Result<GatewayResponse, GatewayError>>>>,
    requests: Arc<Mutex<Vec<GatewayRequest>>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<GatewayResponse, GatewayError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Every call waits for `gate` to be notified before replying.
    pub fn gated(replies: Vec<Result<GatewayResponse, GatewayError>>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(replies)
        }
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn generate(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        self.requests.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::EmptyResponse("script exhausted".into())))
    }
}
