//! REST API Server for the banking assistant
//!
//! Exposes the turn orchestrator via HTTP endpoints and serves the chat UI
//! from the static directory.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::TurnOrchestrator;
use crate::error::AssistantError;
use crate::models::{Context, Reply};

/// Uploaded pictures arrive as base64 data URIs.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

const INITIALIZING_TEXT: &str = "Assistant initialization in progress. Please try again.";
const SETUP_FAILED_TEXT: &str = "The app failed to initialize properly. Setup and restart needed.";

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MessageInput {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub input: Option<MessageInput>,
    #[serde(default)]
    pub context: Option<Context>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PictureInput {
    #[serde(rename = "picInput")]
    pub pic_input: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PictureRequest {
    pub input: PictureInput,
    #[serde(default)]
    pub context: Option<Context>,
}

/// =============================
/// Error Responses
/// =============================

fn chat_text(text: String) -> Response {
    (StatusCode::OK, Json(json!({ "output": { "text": text } }))).into_response()
}

impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        match self {
            AssistantError::NotReady => chat_text(INITIALIZING_TEXT.to_string()),
            AssistantError::Setup(reason) => chat_text(format!("{} {}", SETUP_FAILED_TEXT, reason)),
            other => {
                let code = other.status_code();
                error!(status = code, "Turn failed: {}", other);
                let status =
                    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(json!({ "error": other.to_string(), "code": code }))).into_response()
            }
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<TurnOrchestrator>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoints
/// =============================

async fn message_handler(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<Reply>, AssistantError> {
    let text = req.input.and_then(|i| i.text);
    let reply = state
        .orchestrator
        .handle_turn(text.as_deref(), req.context)
        .await?;
    Ok(Json(reply))
}

async fn picture_handler(
    State(state): State<ApiState>,
    Json(req): Json<PictureRequest>,
) -> Result<Json<Reply>, AssistantError> {
    let reply = state
        .orchestrator
        .handle_picture(&req.input.pic_input, req.context)
        .await?;
    Ok(Json(reply))
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<TurnOrchestrator>, static_dir: PathBuf) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/message", post(message_handler))
        .route("/api/picture", post(picture_handler))
        .with_state(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<TurnOrchestrator>,
    static_dir: PathBuf,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator, static_dir);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TurnSettings;
    use crate::data::{InMemoryBankData, DEMO_CUSTOMER_ID};
    use crate::test_support::{reply, FailingData, RecordingDistances, ScriptedDialog};
    use crate::workspace::WorkspaceHandle;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn router(
        dialog: Arc<ScriptedDialog>,
        data: Arc<dyn crate::data::AccountDataProvider>,
        workspace: WorkspaceHandle,
    ) -> Router {
        let orchestrator = TurnOrchestrator::new(
            dialog,
            data,
            Arc::new(RecordingDistances::new(None)),
            None,
            workspace,
            TurnSettings {
                customer_id: DEMO_CUSTOMER_ID,
                maps_api_key: "k".into(),
                branch_destination: "Main St 1".into(),
            },
        );
        create_router(Arc::new(orchestrator), PathBuf::from("public"))
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_message_before_workspace_ready() {
        let app = router(
            Arc::new(ScriptedDialog::new()),
            Arc::new(InMemoryBankData::demo()),
            WorkspaceHandle::new(),
        );

        let (status, body) = post_json(app, "/api/message", json!({ "input": { "text": "hi" } })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"]["text"], INITIALIZING_TEXT);
    }

    #[tokio::test]
    async fn test_message_after_setup_failure() {
        let workspace = WorkspaceHandle::new();
        workspace.fail("Workspace definition missing");
        let app = router(
            Arc::new(ScriptedDialog::new()),
            Arc::new(InMemoryBankData::demo()),
            workspace,
        );

        let (status, body) = post_json(app, "/api/message", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["output"]["text"],
            format!("{} Workspace definition missing", SETUP_FAILED_TEXT)
        );
    }

    #[tokio::test]
    async fn test_message_returns_dialog_reply() {
        let dialog = Arc::new(ScriptedDialog::new().with_reply(reply(
            &["Your balance:"],
            json!({ "action": { "lookup": "balance", "account_type": "savings", "append_response": true } }),
        )));
        let app = router(
            dialog.clone(),
            Arc::new(InMemoryBankData::demo()),
            WorkspaceHandle::ready("ws-1"),
        );

        let (status, body) = post_json(
            app,
            "/api/message",
            json!({ "input": { "text": "balance" }, "context": { "conversation_id": "c-9" } }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["output"]["text"],
            json!(["Your balance:", "xxx3635 savings Balance: INR 84,210.55<br/>"])
        );
        assert_eq!(body["context"]["accounts"][0]["number"], "xxx3635");
        assert!(body["context"].get("action").is_none());
        assert_eq!(
            dialog.turns()[0].context.extra.get("conversation_id"),
            Some(&json!("c-9"))
        );
    }

    #[tokio::test]
    async fn test_message_accepts_loosely_typed_context() {
        let app = router(
            Arc::new(ScriptedDialog::new()),
            Arc::new(InMemoryBankData::demo()),
            WorkspaceHandle::ready("ws-1"),
        );

        let (status, body) = post_json(
            app,
            "/api/message",
            json!({
                "input": { "text": "hi" },
                "context": { "person": { "customer_id": 7829706, "fname": null }, "age": "35" }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"]["text"], json!(["ok"]));
        assert_eq!(body["context"]["age"], 35.0);
        assert_eq!(body["context"]["person"]["fname"], "");
    }

    #[tokio::test]
    async fn test_upstream_status_is_forwarded() {
        let app = router(
            Arc::new(ScriptedDialog::new()),
            Arc::new(FailingData { status: 404 }),
            WorkspaceHandle::ready("ws-1"),
        );

        let (status, body) = post_json(app, "/api/message", json!({ "input": { "text": "hi" } })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn test_picture_without_classifier() {
        let app = router(
            Arc::new(ScriptedDialog::new()),
            Arc::new(InMemoryBankData::demo()),
            WorkspaceHandle::ready("ws-1"),
        );

        let (status, _) = post_json(
            app,
            "/api/picture",
            json!({ "input": { "picInput": "data:image/png;base64,aGVsbG8=" } }),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(
            Arc::new(ScriptedDialog::new()),
            Arc::new(InMemoryBankData::demo()),
            WorkspaceHandle::new(),
        );

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
