pub mod analysis;
pub mod corpus;
pub mod events;
pub mod health;

use axum::http::{header, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::request_logger;
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.server.allowed_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(axum::middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Document corpora: ingest, query, sentiment.
        .route("/corpora/{id}/text", put(corpus::ingest_text))
        .route("/corpora/{id}/documents", put(corpus::ingest_documents))
        .route("/corpora/{id}", get(corpus::corpus_status))
        .route("/corpora/{id}", delete(corpus::delete_corpus))
        .route("/corpora/{id}/ask", post(corpus::ask_corpus))
        .route("/corpora/{id}/sentiment", post(corpus::corpus_sentiment))
        // Event catalog and per-event Q&A.
        .route("/events", get(events::list_events))
        .route("/events/{name}", put(events::upsert_event))
        .route("/events/{name}", delete(events::delete_event))
        .route("/events/{name}/ask", post(events::ask_event))
        // Image analysis sessions and their archive.
        .route("/images", post(analysis::create_image_session))
        .route("/images/{session_id}/ask", post(analysis::ask_image_session))
        .route("/images/{session_id}", delete(analysis::delete_image_session))
        .route("/history", get(analysis::list_history))
        .route("/history/{name}", get(analysis::load_history))
        // Single-shot flows.
        .route("/assistant/ask", post(analysis::ask_assistant))
        .route("/invoices/analyze", post(analysis::analyze_invoice))
        .route("/resumes/evaluate", post(analysis::evaluate_resume))
        .route("/resumes/match", post(analysis::match_resume))
}
