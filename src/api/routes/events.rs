use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpsertEventRequest {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub events: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

pub async fn list_events(State(state): State<AppState>) -> ApiResult<Json<EventListResponse>> {
    let events = state.events.list().await?;
    Ok(Json(EventListResponse { events }))
}

pub async fn upsert_event(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpsertEventRequest>,
) -> ApiResult<StatusCode> {
    state.events.upsert(&name, &request.description).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.events.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ask_event(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<AskRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let answer = state.events.ask(&name, &request.question).await?;
    Ok(Json(AnswerResponse { answer }))
}
