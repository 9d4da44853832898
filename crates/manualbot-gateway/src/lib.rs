//! manualbot-gateway: HTTP server exposing the query pipeline.
//!
//! Routes:
//! - `POST /api/chat` — run the pipeline for the caller's message list;
//!   on success the upstream completion JSON is returned verbatim.
//! - `GET /health` — liveness check.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use manualbot_config::ServerConfig;
use manualbot_rag::pipeline::Pipeline;
use manualbot_types::{Conversation, Message, PipelineError, Role};

/// Shared server state.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Build the application router.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let state = Arc::new(AppState { pipeline });
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler).fallback(method_not_allowed))
        .with_state(state)
}

/// Start the HTTP server. Runs until the process is terminated.
pub async fn start_server(
    config: &ServerConfig,
    pipeline: Arc<Pipeline>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(pipeline);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Server listening on {addr}");
    info!("  Chat:   http://{addr}/api/chat");
    info!("  Health: http://{addr}/health");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /health — simple liveness check.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Request body for POST /api/chat.
///
/// The last user entry is the current question; everything before it is
/// forwarded as conversation history.
#[derive(Deserialize)]
struct ChatRequest {
    messages: Vec<Message>,
}

/// POST /api/chat — run the pipeline and pass the completion through.
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let Some(question_idx) = request
        .messages
        .iter()
        .rposition(|m| m.role == Role::User)
    else {
        return error_body(
            StatusCode::BAD_REQUEST,
            "request contains no user message",
        );
    };

    let question = request.messages[question_idx].content.clone();
    let history = Conversation::from_messages(request.messages[..question_idx].to_vec());

    match state.pipeline.run(&history, &question).await {
        Ok(run) => (StatusCode::OK, Json(run.completion.raw)).into_response(),
        Err(err) => pipeline_error_response(err),
    }
}

/// Any other method on /api/chat.
async fn method_not_allowed() -> Response {
    error_body(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// Map a pipeline failure onto the HTTP contract: upstream failures keep
/// their status and body for diagnosis; everything else is a generic 500
/// with full detail only in the server log.
fn pipeline_error_response(err: PipelineError) -> Response {
    match err {
        PipelineError::Upstream { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            error_body(status, &body)
        }
        PipelineError::InvalidRequest(msg) => error_body(StatusCode::BAD_REQUEST, &msg),
        other => {
            tracing::error!(error = %other, "pipeline request failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use manualbot_config::RetrievalConfig;
    use manualbot_rag::completion::CompletionClient;
    use manualbot_rag::embeddings::EmbeddingClient;
    use manualbot_rag::retrieval::Retriever;
    use manualbot_types::{Completion, Result as PipelineResult, RetrievedChunk};

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingClient for StubEmbedder {
        fn model(&self) -> &str {
            "stub"
        }
        fn dimensions(&self) -> usize {
            3
        }
        async fn embed(&self, _: &str) -> PipelineResult<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
        async fn embed_batch(&self, texts: &[String]) -> PipelineResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    struct StubRetriever;

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn retrieve(
            &self,
            _: &[f32],
            _: usize,
            _: f32,
        ) -> PipelineResult<Vec<RetrievedChunk>> {
            Ok(vec![RetrievedChunk {
                content: "a reference document".into(),
                similarity: 0.9,
            }])
        }
    }

    enum CompleterBehavior {
        Succeed,
        FailUpstream,
        FailTransport,
    }

    struct StubCompleter(CompleterBehavior);

    #[async_trait]
    impl CompletionClient for StubCompleter {
        fn model(&self) -> &str {
            "stub-chat"
        }
        async fn complete(&self, _: &[Message]) -> PipelineResult<Completion> {
            match self.0 {
                CompleterBehavior::Succeed => Ok(Completion {
                    reply: "grounded answer".into(),
                    raw: json!({
                        "id": "cmpl-test",
                        "choices": [{"message": {"role": "assistant", "content": "grounded answer"}}]
                    }),
                }),
                CompleterBehavior::FailUpstream => Err(PipelineError::Upstream {
                    status: 500,
                    body: "upstream exploded".into(),
                }),
                CompleterBehavior::FailTransport => {
                    Err(PipelineError::Transport("connection refused".into()))
                }
            }
        }
    }

    fn test_router(behavior: CompleterBehavior) -> Router {
        let pipeline = Pipeline::new(
            Arc::new(StubEmbedder),
            Arc::new(StubRetriever),
            Arc::new(StubCompleter(behavior)),
            RetrievalConfig::default(),
        );
        router(Arc::new(pipeline))
    }

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_success_returns_upstream_json_verbatim() {
        let app = test_router(CompleterBehavior::Succeed);
        let request = chat_request(json!({
            "messages": [{"role": "user", "content": "출퇴근 할인 비율이 얼마야?"}]
        }));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], "cmpl-test");
        assert_eq!(
            body["choices"][0]["message"]["content"],
            "grounded answer"
        );
    }

    #[tokio::test]
    async fn test_chat_upstream_failure_propagates_status_and_error_key() {
        let app = test_router(CompleterBehavior::FailUpstream);
        let request = chat_request(json!({
            "messages": [{"role": "user", "content": "anything"}]
        }));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_chat_transport_failure_is_generic_500() {
        let app = test_router(CompleterBehavior::FailTransport);
        let request = chat_request(json!({
            "messages": [{"role": "user", "content": "anything"}]
        }));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        // Transport detail stays in the server log, not the response.
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn test_non_post_method_is_405_with_error_body() {
        let app = test_router(CompleterBehavior::Succeed);
        let request = Request::builder()
            .method("GET")
            .uri("/api/chat")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(response).await;
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn test_request_without_user_message_is_400() {
        let app = test_router(CompleterBehavior::Succeed);
        let request = chat_request(json!({
            "messages": [{"role": "assistant", "content": "only an answer"}]
        }));

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_router(CompleterBehavior::Succeed);
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }
}
