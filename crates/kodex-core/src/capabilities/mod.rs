//! Capability functions: one Gateway round trip each
//!
//! Each capability builds a single `GatewayRequest`, races it against the
//! caller's cancellation token and interprets the reply. Failures come back
//! as typed `GatewayError`s; turning them into user-facing text is left to
//! the orchestrator.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::ModelSet;
use crate::errors::GatewayError;
use crate::gateway::{Gateway, GatewayRequest, GatewayResponse};

mod conversation;
mod design;
mod knowledge;

pub use design::{vectorize_schema, GENERATION_SUFFIX};
pub use knowledge::{logo_palette_schema, refined_knowledge_schema};

#[derive(Clone)]
pub struct Capabilities {
    gateway: Arc<dyn Gateway>,
    models: ModelSet,
}

impl Capabilities {
    pub fn new(gateway: Arc<dyn Gateway>, models: ModelSet) -> Self {
        Self { gateway, models }
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    /// Sends one request unless `cancel` fires first.
    async fn call(
        &self,
        request: GatewayRequest,
        cancel: &CancellationToken,
    ) -> Result<GatewayResponse, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let model = request.model.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Gateway call to {} cancelled", model);
                Err(GatewayError::Cancelled)
            }
            result = self.gateway.generate(request) => result,
        }
    }
}
