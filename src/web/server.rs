//! HTTP API surface
//!
//! Thin axum layer over [`Assistant`]: the study frontend drives the chat,
//! onboarding assessment, and feedback endpoints; the researcher dashboard
//! reads metrics and recent interactions.

use crate::assessment::{CognitiveAssessment, ExplanationContent};
use crate::dataset::{import, TableData};
use crate::pipeline::Assistant;
use crate::profile::{AssessmentScores, Demographics, UserProfile};
use crate::study::{DecisionMetrics, FeedbackRecord, InteractionRecord};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state
pub type AppState = Arc<Assistant>;

/// Start the web server
pub async fn start_server(assistant: Assistant, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let state: AppState = Arc::new(assistant);

    let api_routes = Router::new()
        .route("/chat", post(chat))
        .route("/assess", post(assess_question))
        .route("/assessment", post(submit_assessment))
        .route("/feedback", post(submit_feedback))
        .route("/metrics", get(metrics))
        .route("/schema", get(schema))
        .route("/interactions", get(recent_interactions))
        .route("/profile/:user_id", get(profile))
        .route("/dataset/import", post(import_dataset))
        .route("/health", get(health_check))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    println!("Adaptive SQL Assistant running on http://localhost:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Deserialize)]
struct ChatRequest {
    user_id: String,
    question: String,
    /// When set, the response carries the full assessment and profile
    #[serde(default)]
    debug: bool,
}

#[derive(Serialize)]
struct ChatResponse {
    success: bool,
    data: Option<TableData>,
    sql_text: String,
    error: Option<String>,
    execution_time: f64,
    complexity_score: u8,
    explanation: Option<ExplanationContent>,
    session_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assessment: Option<CognitiveAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<UserProfile>,
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let outcome = state.handle_question(&req.user_id, &req.question).await;

    Json(ChatResponse {
        success: outcome.result.success,
        data: outcome.result.data,
        sql_text: outcome.result.sql_text,
        error: outcome.result.error,
        execution_time: outcome.result.execution_time,
        complexity_score: outcome.result.complexity_score,
        explanation: outcome.explanation,
        session_id: outcome.session_id,
        assessment: req.debug.then_some(outcome.assessment),
        profile: req.debug.then_some(outcome.profile),
    })
}

#[derive(Deserialize)]
struct AssessRequest {
    user_id: String,
    question: String,
}

/// Full pre-query difficulty assessment, used by the task screens
async fn assess_question(
    State(state): State<AppState>,
    Json(req): Json<AssessRequest>,
) -> Json<CognitiveAssessment> {
    Json(state.assess_question(&req.user_id, &req.question).await)
}

#[derive(Deserialize)]
struct AssessmentRequest {
    user_id: String,
    scores: AssessmentScores,
    #[serde(default)]
    demographics: Demographics,
}

#[derive(Serialize)]
struct AssessmentResponse {
    user_id: String,
    total_score: u8,
    level: String,
    capability_threshold: f64,
}

async fn submit_assessment(
    State(state): State<AppState>,
    Json(req): Json<AssessmentRequest>,
) -> Result<Json<AssessmentResponse>, StatusCode> {
    let profile = state
        .submit_assessment(&req.user_id, req.scores, req.demographics)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to store assessment");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(AssessmentResponse {
        user_id: profile.user_id.clone(),
        total_score: req.scores.total(),
        level: profile.user_level_category.as_str().to_string(),
        capability_threshold: profile.capability_threshold(),
    }))
}

#[derive(Deserialize)]
struct FeedbackRequest {
    user_id: String,
    session_id: i64,
    explanation_given: bool,
    was_needed: Option<bool>,
    was_helpful: Option<bool>,
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<StatusCode, StatusCode> {
    state
        .submit_feedback(&FeedbackRecord {
            user_id: req.user_id,
            session_id: req.session_id,
            explanation_given: req.explanation_given,
            was_needed: req.was_needed,
            was_helpful: req.was_helpful,
        })
        .map_err(|err| {
            tracing::error!(error = %err, "failed to store feedback");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(StatusCode::CREATED)
}

async fn metrics(State(state): State<AppState>) -> Result<Json<DecisionMetrics>, StatusCode> {
    state.metrics().map(Json).map_err(|err| {
        tracing::error!(error = %err, "failed to compute metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

#[derive(Serialize)]
struct SchemaResponse {
    snapshot: String,
}

async fn schema(State(state): State<AppState>) -> Result<Json<SchemaResponse>, StatusCode> {
    state
        .schema_snapshot()
        .map(|snapshot| Json(SchemaResponse { snapshot }))
        .map_err(|err| {
            tracing::error!(error = %err, "failed to build schema snapshot");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn recent_interactions(State(state): State<AppState>) -> Json<Vec<InteractionRecord>> {
    Json(state.recent_interactions())
}

async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<UserProfile> {
    Json(state.profile(&user_id))
}

#[derive(Deserialize)]
struct ImportRequest {
    csv_path: PathBuf,
}

#[derive(Serialize)]
struct ImportResponse {
    rows_imported: usize,
}

async fn import_dataset(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, StatusCode> {
    import::import_superstore_csv(state.dataset(), &req.csv_path)
        .map(|rows_imported| Json(ImportResponse { rows_imported }))
        .map_err(|err| {
            tracing::error!(error = %err, "dataset import failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
