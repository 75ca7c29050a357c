//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use super::handlers;
use super::models::{ApiResponse, QuestionsRequest, SuggestionsRequest, TranscriptRequest};
use crate::error::QaError;
use crate::processing::BatchProcessor;
use crate::suggest::QuestionSuggester;
use crate::youtube::TranscriptSource;

const INDEX_HTML: &str = include_str!("index.html");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<BatchProcessor>,
    pub transcripts: TranscriptSource,
    pub suggester: Arc<QuestionSuggester>,
}

/// Build the application router with all routes and middleware
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(serve_ui))
        .route("/health", get(health_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/transcript", post(transcript_handler))
        .route("/api/suggestions", post(suggestions_handler))
        .route("/api/sessions/:id/questions", post(questions_handler))
        .route(
            "/api/sessions/:id/history",
            get(history_handler).delete(clear_history_handler),
        )
        .route("/api/cache", delete(clear_cache_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = router(state);

    let address = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("🌐 API server listening on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn status_for(err: &QaError) -> StatusCode {
    match err {
        QaError::InvalidUrl(_) | QaError::EmptyQuestion => StatusCode::BAD_REQUEST,
        QaError::TranscriptUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: QaError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    (status, Json(ApiResponse::<()>::error(err.to_string()))).into_response()
}

fn ok<T: serde::Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

async fn serve_ui() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(handlers::health_check(&state).await)
}

async fn create_session_handler() -> Response {
    ok(handlers::create_session())
}

async fn transcript_handler(
    State(state): State<AppState>,
    Json(request): Json<TranscriptRequest>,
) -> Response {
    match handlers::get_transcript(&state, &request.url).await {
        Ok(data) => ok(data),
        Err(e) => error_response(e),
    }
}

async fn suggestions_handler(
    State(state): State<AppState>,
    Json(request): Json<SuggestionsRequest>,
) -> Response {
    match handlers::suggest_questions(&state, &request).await {
        Ok(data) => ok(data),
        Err(e) => error_response(e),
    }
}

async fn questions_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<QuestionsRequest>,
) -> Response {
    match handlers::process_questions(&state, &id, &request).await {
        Ok(data) => ok(data),
        Err(e) => error_response(e),
    }
}

async fn history_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    ok(handlers::get_history(&state, &id).await)
}

async fn clear_history_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    handlers::clear_history(&state, &id).await;
    ok(serde_json::json!({ "cleared": id }))
}

async fn clear_cache_handler(State(state): State<AppState>) -> Response {
    handlers::clear_cache(&state).await;
    ok(serde_json::json!({ "cleared": true }))
}
