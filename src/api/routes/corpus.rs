use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::application::IngestSummary;
use crate::domain::DomainError;
use crate::infrastructure::extract;

#[derive(Debug, Deserialize)]
pub struct IngestTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct CorpusStatusResponse {
    pub corpus_id: String,
    pub ready: bool,
}

/// Ingests raw text under the corpus id, replacing any previous index.
pub async fn ingest_text(
    State(state): State<AppState>,
    Path(corpus_id): Path<String>,
    Json(request): Json<IngestTextRequest>,
) -> ApiResult<Json<IngestSummary>> {
    let summary = state.retrieval.ingest(&corpus_id, &request.text).await?;
    Ok(Json(summary))
}

/// Ingests one or more uploaded PDFs: text is extracted per file,
/// concatenated in upload order, and indexed as one corpus.
pub async fn ingest_documents(
    State(state): State<AppState>,
    Path(corpus_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<IngestSummary>> {
    let mut documents: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(DomainError::validation(format!("bad multipart body: {e}"))))?
    {
        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError(DomainError::validation(format!("bad multipart body: {e}"))))?;
        documents.push((file_name, bytes.to_vec()));
    }

    let text = extract::extract_pdf_corpus(&documents)?;
    let summary = state.retrieval.ingest(&corpus_id, &text).await?;
    Ok(Json(summary))
}

pub async fn corpus_status(
    State(state): State<AppState>,
    Path(corpus_id): Path<String>,
) -> ApiResult<Json<CorpusStatusResponse>> {
    let ready = state.retrieval.is_ready(&corpus_id).await?;
    Ok(Json(CorpusStatusResponse { corpus_id, ready }))
}

pub async fn ask_corpus(
    State(state): State<AppState>,
    Path(corpus_id): Path<String>,
    Json(request): Json<AskRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let answer = state.retrieval.ask(&corpus_id, &request.question).await?;
    Ok(Json(AnswerResponse { answer }))
}

pub async fn corpus_sentiment(
    State(state): State<AppState>,
    Path(corpus_id): Path<String>,
) -> ApiResult<Json<AnswerResponse>> {
    let answer = state.retrieval.sentiment(&corpus_id).await?;
    Ok(Json(AnswerResponse { answer }))
}

pub async fn delete_corpus(
    State(state): State<AppState>,
    Path(corpus_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.retrieval.delete(&corpus_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
