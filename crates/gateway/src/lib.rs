//! HTTP API gateway for tabsplit.
//!
//! Exposes the bill-splitting engine as a REST API: session lifecycle,
//! receipt upload, chat commands, settlement, and the fairness audit.
//!
//! Built on Axum for high performance async HTTP.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use tabsplit_core::assignment::Assignments;
use tabsplit_core::error::Error;
use tabsplit_core::extract::ReceiptImage;
use tabsplit_core::receipt::ReceiptData;
use tabsplit_core::settle::Settlement;
use tabsplit_providers::ModelServices;
use tabsplit_session::{AuditOutcome, BillSession, ChatEntry, SharedSession};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: tabsplit_config::AppConfig,
    pub services: ModelServices,
    pub sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let max_upload = state.config.gateway.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/sessions", post(create_session_handler))
        .route("/v1/sessions/{id}", delete(delete_session_handler))
        .route("/v1/sessions/{id}/receipt", post(upload_receipt_handler))
        .route("/v1/sessions/{id}/command", post(command_handler))
        .route("/v1/sessions/{id}/settlement", get(settlement_handler))
        .route("/v1/sessions/{id}/audit", post(audit_handler))
        .route("/v1/sessions/{id}/reset", post(reset_handler))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: tabsplit_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let services = tabsplit_providers::build_from_config(&config)?;
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(GatewayState {
        config,
        services,
        sessions: RwLock::new(HashMap::new()),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Error mapping ---

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Map a domain error onto an HTTP response with a JSON error envelope.
fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::Busy => StatusCode::CONFLICT,
        Error::NoReceipt => StatusCode::BAD_REQUEST,
        Error::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Interpretation(_) | Error::Audit(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        warn!(error = %err, "Request failed");
    }

    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn not_found(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: format!("no session {id}"),
        }),
    )
        .into_response()
}

async fn session_of(state: &SharedState, id: Uuid) -> Option<SharedSession> {
    state.sessions.read().await.get(&id).cloned()
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize, Deserialize)]
struct SessionCreatedResponse {
    session_id: Uuid,
}

async fn create_session_handler(State(state): State<SharedState>) -> Response {
    let session = SharedSession::new(BillSession::new(
        state.services.extractor.clone(),
        state.services.interpreter.clone(),
        state.services.auditor.clone(),
    ));

    let id = Uuid::new_v4();
    state.sessions.write().await.insert(id, session);
    info!(session = %id, "Session created");

    (
        StatusCode::CREATED,
        Json(SessionCreatedResponse { session_id: id }),
    )
        .into_response()
}

async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.sessions.write().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(id),
    }
}

#[derive(Serialize)]
struct ReceiptResponse {
    receipt: ReceiptData,
    transcript: Vec<ChatEntry>,
}

/// Receipt upload: the raw image as the request body, mime type from the
/// Content-Type header.
async fn upload_receipt_handler(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let Some(session) = session_of(&state, id).await else {
        return not_found(id);
    };

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();

    let image = ReceiptImage::new(body.to_vec(), mime_type);

    match session.load_receipt(&image).await {
        Ok(receipt) => {
            let transcript = session.transcript().await;
            Json(ReceiptResponse {
                receipt,
                transcript,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct CommandRequest {
    text: String,
}

#[derive(Serialize)]
struct CommandResponse {
    reply: String,
    applied: bool,
    assignments: Assignments,
    settlement: Settlement,
}

async fn command_handler(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommandRequest>,
) -> Response {
    let Some(session) = session_of(&state, id).await else {
        return not_found(id);
    };

    match session.handle_command(&payload.text).await {
        Ok(outcome) => Json(CommandResponse {
            reply: outcome.reply,
            applied: outcome.applied,
            assignments: outcome.assignments,
            settlement: outcome.settlement,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Serialize)]
struct SettlementResponse {
    receipt: ReceiptData,
    settlement: Settlement,
}

async fn settlement_handler(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Response {
    let Some(session) = session_of(&state, id).await else {
        return not_found(id);
    };

    let Some(receipt) = session.receipt().await else {
        return error_response(Error::NoReceipt);
    };

    match session.settlement().await {
        Ok(settlement) => Json(SettlementResponse {
            receipt,
            settlement,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Serialize)]
struct AuditResponse {
    report: String,
}

async fn audit_handler(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    let Some(session) = session_of(&state, id).await else {
        return not_found(id);
    };

    match session.audit().await {
        Ok(AuditOutcome::Report(report)) => Json(AuditResponse { report }).into_response(),
        Ok(AuditOutcome::Stale) => (
            StatusCode::CONFLICT,
            Json(ErrorBody {
                error: "the bill changed while the audit was running".into(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn reset_handler(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    let Some(session) = session_of(&state, id).await else {
        return not_found(id);
    };

    session.reset().await;
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use tabsplit_core::assignment::AssignmentAction;
    use tabsplit_core::audit::{AuditRequest, SplitAuditor};
    use tabsplit_core::error::{AuditError, ExtractionError, InterpretationError};
    use tabsplit_core::extract::ReceiptExtractor;
    use tabsplit_core::interpret::{CommandContext, CommandInterpreter, Interpretation};
    use tabsplit_core::receipt::ReceiptItem;

    /// One stub backend covering all three capabilities with canned output.
    struct StubModel;

    fn stub_receipt() -> ReceiptData {
        ReceiptData {
            items: vec![
                ReceiptItem {
                    id: "1".into(),
                    name: "Burger".into(),
                    price: 10.0,
                    quantity: 1,
                },
                ReceiptItem {
                    id: "2".into(),
                    name: "Fries".into(),
                    price: 6.0,
                    quantity: 1,
                },
            ],
            subtotal: 16.0,
            tax: 1.6,
            tip: 3.2,
            total: 20.8,
            currency: "$".into(),
        }
    }

    #[async_trait]
    impl ReceiptExtractor for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        async fn extract(
            &self,
            _image: &ReceiptImage,
        ) -> std::result::Result<ReceiptData, ExtractionError> {
            Ok(stub_receipt())
        }
    }

    #[async_trait]
    impl CommandInterpreter for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        async fn interpret(
            &self,
            _text: &str,
            _context: &CommandContext,
        ) -> std::result::Result<Interpretation, InterpretationError> {
            Ok(Interpretation {
                reply: "Burger on Tom.".into(),
                assignments: vec![AssignmentAction::assign(["1"], ["Tom"])],
            })
        }
    }

    #[async_trait]
    impl SplitAuditor for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        async fn audit(
            &self,
            _request: &AuditRequest,
        ) -> std::result::Result<String, AuditError> {
            Ok("One item is still unassigned.".into())
        }
    }

    fn test_app() -> Router {
        let state = Arc::new(GatewayState {
            config: tabsplit_config::AppConfig::default(),
            services: ModelServices::from_backend(Arc::new(StubModel)),
            sessions: RwLock::new(HashMap::new()),
        });
        build_router(state)
    }

    async fn json_of(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_of(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn upload_receipt(app: &Router, id: &str) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/sessions/{id}/receipt"))
                    .header("Content-Type", "image/jpeg")
                    .body(Body::from(vec![0xFFu8, 0xD8, 0xFF]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/sessions/{}/settlement", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_returns_receipt_and_greeting() {
        let app = test_app();
        let id = create_session(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/sessions/{id}/receipt"))
                    .header("Content-Type", "image/jpeg")
                    .body(Body::from(vec![1u8, 2, 3]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["receipt"]["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["transcript"][0]["speaker"], "assistant");
    }

    #[tokio::test]
    async fn command_applies_and_returns_settlement() {
        let app = test_app();
        let id = create_session(&app).await;
        upload_receipt(&app, &id).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/sessions/{id}/command"))
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"text": "the burger was Tom's"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["reply"], "Burger on Tom.");
        assert_eq!(body["applied"], true);
        assert_eq!(body["assignments"]["1"][0], "Tom");
        assert_eq!(body["settlement"]["people"][0]["name"], "Tom");
        assert_eq!(body["settlement"]["unassigned"][0]["id"], "2");
    }

    #[tokio::test]
    async fn command_before_upload_is_rejected() {
        let app = test_app();
        let id = create_session(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/sessions/{id}/command"))
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"text": "hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn settlement_includes_receipt_totals() {
        let app = test_app();
        let id = create_session(&app).await;
        upload_receipt(&app, &id).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/sessions/{id}/settlement"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["receipt"]["total"], 20.8);
        assert_eq!(body["settlement"]["unassigned"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn audit_returns_the_report() {
        let app = test_app();
        let id = create_session(&app).await;
        upload_receipt(&app, &id).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/sessions/{id}/audit"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(response).await;
        assert_eq!(body["report"], "One item is still unassigned.");
    }

    #[tokio::test]
    async fn reset_then_settlement_is_bad_request() {
        let app = test_app();
        let id = create_session(&app).await;
        upload_receipt(&app, &id).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/sessions/{id}/reset"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/sessions/{id}/settlement"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_session_then_404() {
        let app = test_app();
        let id = create_session(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/v1/sessions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/sessions/{id}/settlement"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
