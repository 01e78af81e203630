// src/test_utils/mock_gateway_server.rs
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// A scripted reply: a Gemini response body, or an HTTP status with an error body.
pub type MockReply = Result<Value, (u16, Value)>;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The `{model}:{action}` path segment, e.g. `gemini-2.0-flash:generateContent`.
    pub model_action: String,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

#[derive(Clone)]
struct MockServerState {
    responses: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn generate_content_handler(
    State(state): State<MockServerState>,
    Path(model_action): Path<String>,
    Query(query): Query<KeyQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    log::debug!("Mock Gemini server received request for {}", model_action);
    state.requests.lock().unwrap().push(RecordedRequest {
        model_action,
        api_key: query.key,
        body,
    });

    match state.responses.lock().unwrap().pop_front() {
        Some(Ok(reply)) => Ok(Json(reply)),
        Some(Err((status, error_body))) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Err((status, Json(error_body)))
        }
        None => {
            log::error!("Mock Gemini server ran out of responses!");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"error": {"code": 503, "message": "no scripted response"}})),
            ))
        }
    }
}

pub struct MockGatewayServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    recorded_requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockGatewayServer {
    pub async fn start(responses: Vec<MockReply>) -> Self {
        let state = MockServerState {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let recorded_requests = state.requests.clone();

        let app = Router::new()
            .route("/models/{model_action}", post(generate_content_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Gemini server");
        let addr = listener.local_addr().unwrap();
        log::info!("Mock Gemini server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| log::error!("Mock Gemini server error: {}", e));
        });

        Self {
            addr,
            shutdown_tx,
            recorded_requests,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock Gemini server already stopped.");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }
}
