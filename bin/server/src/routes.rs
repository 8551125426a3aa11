//! HTTP routes.
//!
//! The adapter is thin: handlers deserialize, call into the generator or
//! the workflow crate, and serialize. Generation never fails at this
//! layer; the orchestrator always produces a workflow or a prompt-help
//! result.

use crate::error::ApiError;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use flowsmith_generator::{GenerationOrchestrator, GenerationRequest, GenerationResult};
use flowsmith_workflow::{NodeTypeSpec, ValidationReport, Workflow};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<GenerationOrchestrator>,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: GenerationOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate", post(generate))
        .route("/api/validate", post(validate))
        .route("/api/node-types", get(node_types))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[instrument(skip_all)]
async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Json<GenerationResult> {
    let result = state.orchestrator.respond(&request).await;
    info!(success = result.is_success(), "generation request served");
    Json(result)
}

/// Response body for `POST /api/validate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    pub report: ValidationReport,
    pub applied_fixes: Vec<String>,
    pub repaired: Workflow,
}

#[instrument(skip_all)]
async fn validate(
    State(state): State<AppState>,
    Json(document): Json<JsonValue>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let workflow = Workflow::from_json_value(document)?;
    let outcome = state.orchestrator.repair_engine().repair(workflow);
    let report = state.orchestrator.validator().validate(&outcome.workflow);

    Ok(Json(ValidateResponse {
        valid: report.is_valid(),
        report,
        applied_fixes: outcome.applied_fixes,
        repaired: outcome.workflow,
    }))
}

async fn node_types(State(state): State<AppState>) -> Json<Vec<NodeTypeSpec>> {
    Json(
        state
            .orchestrator
            .registry()
            .specs()
            .into_iter()
            .cloned()
            .collect(),
    )
}
