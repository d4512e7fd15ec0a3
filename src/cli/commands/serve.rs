//! HTTP API server.
//!
//! Provides REST endpoints for form ingestion, listing and question answering.

use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::Readiness;
use crate::error::FormragError;
use crate::ingest::{IngestRequest, ResponseInput};
use crate::orchestrator::Orchestrator;
use crate::rag::AnalysisResult;
use crate::store::{Field, Form};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;
    let state = Arc::new(AppState { orchestrator });

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Formrag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("List forms", "GET  /forms");
    Output::kv("Create form", "POST /forms");
    Output::kv("Get form", "GET  /forms/{id}");
    Output::kv("Add responses", "POST /forms/{id}/responses");
    Output::kv("Analyze", "POST /analyze");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    if let Readiness::Failed(reason) = state.orchestrator.readiness() {
        return Err(FormragError::ModelUnavailable(reason).into());
    }
    Ok(())
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/forms", get(list_forms).post(create_form))
        .route("/forms/{id}", get(get_form))
        .route("/forms/{id}/responses", post(append_responses))
        .route("/analyze", post(analyze))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Resolves on Ctrl+C, or when the embedding model fails to initialize.
async fn shutdown_signal(state: Arc<AppState>) {
    let init_failed = async {
        if state.orchestrator.wait_ready().await.is_err() {
            return;
        }
        std::future::pending::<()>().await;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
        _ = init_failed => error!("Embedding model failed to initialize, shutting down"),
    }
}

/// Map an error category to the HTTP status used for it.
fn status_for(kind: &str) -> StatusCode {
    match kind {
        "form_not_found" => StatusCode::NOT_FOUND,
        "invalid_input" => StatusCode::BAD_REQUEST,
        "model_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
        "generation_failed" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AppendRequest {
    responses: Vec<ResponseInput>,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(alias = "formId")]
    form_id: String,
    question: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct FormListing {
    id: Uuid,
    name: String,
    response_count: usize,
}

#[derive(Serialize)]
struct FormView {
    id: Uuid,
    name: String,
    fields: Vec<Field>,
    responses: Vec<ResponseView>,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ResponseView {
    id: Uuid,
    data: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<Form> for FormView {
    fn from(form: Form) -> Self {
        Self {
            id: form.id,
            name: form.name,
            fields: form.fields,
            responses: form
                .responses
                .into_iter()
                .map(|r| ResponseView {
                    id: r.id,
                    data: r.data,
                    created_at: r.created_at,
                })
                .collect(),
            created_at: form.created_at,
        }
    }
}

#[derive(Serialize)]
struct AppendResponse {
    form_id: String,
    response_count: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

/// Error body with the status derived from its kind.
struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl From<FormragError> for ApiError {
    fn from(e: FormragError) -> Self {
        Self {
            status: status_for(e.kind()),
            body: ErrorResponse {
                error: e.to_string(),
                kind: e.kind().to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            body: ErrorResponse {
                error: rejection.body_text(),
                kind: "invalid_input".to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.orchestrator.readiness();
    let status = match readiness {
        Readiness::Ready => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(serde_json::json!({ "status": readiness.to_string() })))
}

async fn list_forms(State(state): State<Arc<AppState>>) -> Result<Json<Vec<FormListing>>, ApiError> {
    let forms = state.orchestrator.store().list_forms().await?;
    Ok(Json(
        forms
            .into_iter()
            .map(|f| FormListing {
                id: f.id,
                name: f.name,
                response_count: f.response_count,
            })
            .collect(),
    ))
}

async fn create_form(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<FormView>, ApiError> {
    let Json(request) = payload?;
    let form = state.orchestrator.ingestor().ingest(request).await?;
    Ok(Json(form.into()))
}

async fn get_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FormView>, ApiError> {
    let form = state.orchestrator.store().get_form(&id).await?;
    Ok(Json(form.into()))
}

async fn append_responses(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<AppendRequest>, JsonRejection>,
) -> Result<Json<AppendResponse>, ApiError> {
    let Json(request) = payload?;
    let response_count = state
        .orchestrator
        .ingestor()
        .append(&id, request.responses)
        .await?;
    Ok(Json(AppendResponse {
        form_id: id,
        response_count,
    }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let engine = state.orchestrator.engine();
    let limit = request.limit.unwrap_or_else(|| engine.limit());
    if limit == 0 {
        return Err(FormragError::InvalidInput("limit must be greater than zero".to_string()).into());
    }

    let result = engine
        .analyze_with_limit(&request.form_id, &request.question, limit)
        .await;

    let status = match &result {
        AnalysisResult::Failed { kind, .. } => status_for(kind),
        _ => StatusCode::OK,
    };
    Ok((status, Json(result)).into_response())
}
