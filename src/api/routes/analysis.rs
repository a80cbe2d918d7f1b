use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::domain::{DomainError, SessionRecord};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct ImageSessionResponse {
    pub session_id: Uuid,
    pub image_name: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryListResponse {
    pub sessions: Vec<String>,
}

struct UploadedFile {
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

/// Pulls named fields out of a multipart body. File metadata has to be read
/// before `bytes()` consumes the field.
async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(Vec<UploadedFile>, Vec<(String, String)>), DomainError> {
    let mut files = Vec::new();
    let mut texts = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::validation(format!("bad multipart body: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| DomainError::validation(format!("bad multipart body: {e}")))?;

        match file_name {
            Some(name) => files.push(UploadedFile {
                name,
                mime_type: content_type.unwrap_or_else(|| "application/octet-stream".into()),
                bytes: bytes.to_vec(),
            }),
            None => {
                let value = String::from_utf8(bytes.to_vec())
                    .map_err(|_| DomainError::validation("text field is not valid UTF-8"))?;
                texts.push((field_name, value));
            }
        }
    }

    Ok((files, texts))
}

fn require_file(files: &mut Vec<UploadedFile>, field: &str) -> Result<UploadedFile, DomainError> {
    if files.is_empty() {
        return Err(DomainError::validation(format!(
            "missing file field '{field}'"
        )));
    }
    Ok(files.remove(0))
}

fn require_text(texts: &[(String, String)], field: &str) -> Result<String, DomainError> {
    texts
        .iter()
        .find(|(name, _)| name == field)
        .map(|(_, value)| value.clone())
        .ok_or_else(|| DomainError::validation(format!("missing text field '{field}'")))
}

/// Uploads an image, generates its initial description, and opens a session
/// for follow-up questions.
pub async fn create_image_session(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ImageSessionResponse>)> {
    let (mut files, _) = read_multipart(multipart).await.map_err(ApiError)?;
    let upload = require_file(&mut files, "image").map_err(ApiError)?;

    let session = state
        .analysis
        .open_image_session(&upload.name, &upload.mime_type, upload.bytes)
        .await?;

    let response = ImageSessionResponse {
        session_id: session.id,
        image_name: session.image_name.clone(),
        description: session.description.clone(),
    };
    state
        .sessions
        .write()
        .await
        .insert(session.id, Arc::new(Mutex::new(session)));

    Ok((StatusCode::CREATED, Json(response)))
}

/// The registry lock is released before the model call; only this session's
/// mutex is held while the answer is generated, so questions against other
/// sessions proceed concurrently.
pub async fn ask_image_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AskRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let session = {
        let sessions = state.sessions.read().await;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| ApiError(DomainError::not_found(format!("session {session_id}"))))?
    };

    let mut session = session.lock().await;
    let answer = state
        .analysis
        .ask_image(&mut session, &request.question)
        .await?;
    Ok(Json(AnswerResponse { answer }))
}

pub async fn delete_image_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let removed = state.sessions.write().await.remove(&session_id);
    if removed.is_none() {
        return Err(ApiError(DomainError::not_found(format!(
            "session {session_id}"
        ))));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_history(State(state): State<AppState>) -> ApiResult<Json<HistoryListResponse>> {
    let sessions = state.analysis.list_history().await?;
    Ok(Json(HistoryListResponse { sessions }))
}

pub async fn load_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<SessionRecord>> {
    let record = state.analysis.load_history(&name).await?;
    Ok(Json(record))
}

/// The scope-limited IT assistant.
pub async fn ask_assistant(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let answer = state.analysis.answer_it_question(&request.question).await?;
    Ok(Json(AnswerResponse { answer }))
}

/// Invoice Q&A: multipart with an `image` file and a `question` text field.
pub async fn analyze_invoice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnswerResponse>> {
    let (mut files, texts) = read_multipart(multipart).await.map_err(ApiError)?;
    let upload = require_file(&mut files, "image").map_err(ApiError)?;
    let question = require_text(&texts, "question").map_err(ApiError)?;

    let answer = state
        .analysis
        .analyze_invoice(&upload.mime_type, upload.bytes, &question)
        .await?;
    Ok(Json(AnswerResponse { answer }))
}

/// HR-style review: multipart with a `resume` PDF and a `job_description`
/// text field.
pub async fn evaluate_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnswerResponse>> {
    let (mut files, texts) = read_multipart(multipart).await.map_err(ApiError)?;
    let upload = require_file(&mut files, "resume").map_err(ApiError)?;
    let job_description = require_text(&texts, "job_description").map_err(ApiError)?;

    let answer = state
        .analysis
        .evaluate_resume(upload.bytes, &job_description)
        .await?;
    Ok(Json(AnswerResponse { answer }))
}

/// ATS-style match percentage for the same multipart shape as
/// [`evaluate_resume`].
pub async fn match_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnswerResponse>> {
    let (mut files, texts) = read_multipart(multipart).await.map_err(ApiError)?;
    let upload = require_file(&mut files, "resume").map_err(ApiError)?;
    let job_description = require_text(&texts, "job_description").map_err(ApiError)?;

    let answer = state
        .analysis
        .match_resume(upload.bytes, &job_description)
        .await?;
    Ok(Json(AnswerResponse { answer }))
}
