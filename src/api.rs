use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::ingest::Aggregator;
use crate::report::render_text;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/news", get(news))
        .route("/news/text", get(news_text))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// Config errors are the only failures that reach the caller; feed problems
// just shrink the report.
async fn news(State(state): State<AppState>) -> Response {
    match state.aggregator.run().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "aggregation refused to start");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn news_text(State(state): State<AppState>) -> Response {
    match state.aggregator.run().await {
        Ok(report) => render_text(&report, chrono::Local::now()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "aggregation refused to start");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
