//! Client for the Gemini generative-language REST endpoints.
//!
//! Covers the three remote calls the services need: `generateContent` for
//! complete responses (text plus optional inline image/PDF parts),
//! `streamGenerateContent` with SSE for fragment streams, and
//! `embedContent`/`batchEmbedContents` for embedding vectors.
//!
//! Retry strategy for transient failures (HTTP 429, 5xx, network errors):
//! bounded attempts with exponential backoff, 1s, 2s, 4s, ... capped at 32s.
//! Authentication and other client errors fail immediately.

use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::ports::{Embedder, FragmentStream, GenerateRequest, GenerativeModel, Part};
use crate::domain::{DomainError, Embedding};
use crate::infrastructure::config::{EmbeddingConfig, LlmConfig};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    generation_model: String,
    embedding_model: String,
    dimension: usize,
    temperature: f32,
    max_retries: u32,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        llm: &LlmConfig,
        embedding: &EmbeddingConfig,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_seconds))
            .build()
            .map_err(|e| DomainError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            generation_model: llm.model.clone(),
            embedding_model: embedding.model.clone(),
            dimension: embedding.dimension,
            temperature: llm.temperature,
            max_retries: llm.max_retries,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn generate_body(&self, request: &GenerateRequest) -> GenerateBody {
        let parts = request.parts.iter().map(WirePart::from).collect();
        GenerateBody {
            contents: vec![WireContent { parts }],
            generation_config: GenerationConfig {
                temperature: request.temperature.unwrap_or(self.temperature),
            },
        }
    }

    async fn post_with_retry<B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response, DomainError> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let result = self
                .http
                .post(url)
                .header("x-goog-api-key", &self.api_key)
                .json(body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let detail = response.text().await.unwrap_or_default();
                    let err = classify_status(status, &detail);
                    if err.is_retryable() {
                        tracing::warn!(status = %status, attempt, "remote call failed, retrying");
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!(attempt, "remote call timed out");
                    last_err = Some(DomainError::timeout(format!("remote call timed out: {e}")));
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "remote call failed, retrying");
                    last_err = Some(DomainError::transient(format!("network error: {e}")));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| DomainError::external("remote call failed after retries")))
    }
}

/// Maps an HTTP error status to the error taxonomy: credential problems are
/// fatal configuration errors, rate limits and server errors are transient,
/// everything else is a non-retryable external failure.
fn classify_status(status: reqwest::StatusCode, detail: &str) -> DomainError {
    let detail = if detail.is_empty() { "<no body>" } else { detail };
    match status.as_u16() {
        401 | 403 => DomainError::configuration(format!(
            "authentication with the generative service failed ({status}): {detail}"
        )),
        400 if detail.contains("API key") => DomainError::configuration(format!(
            "generative service rejected the API key: {detail}"
        )),
        429 => DomainError::transient(format!("generative service quota exceeded: {detail}")),
        s if s >= 500 => {
            DomainError::transient(format!("generative service error ({status}): {detail}"))
        }
        _ => DomainError::external(format!("generative service error ({status}): {detail}")),
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, DomainError> {
        let url = self.url(&self.generation_model, "generateContent");
        let body = self.generate_body(request);

        let response = self.post_with_retry(&url, &body).await?;
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DomainError::external(format!("malformed generation response: {e}")))?;

        parsed
            .first_text()
            .ok_or_else(|| DomainError::external("generation response carried no text"))
    }

    async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<FragmentStream, DomainError> {
        let url = format!(
            "{}?alt=sse",
            self.url(&self.generation_model, "streamGenerateContent")
        );
        let body = self.generate_body(request);

        let response = self.post_with_retry(&url, &body).await?;
        Ok(fragment_stream(response.bytes_stream()))
    }
}

/// Wraps an SSE byte stream into a stream of text fragments. The inner
/// stream is never polled again after it reports completion.
fn fragment_stream(
    inner: impl futures::Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> FragmentStream {
    let stream = futures::stream::try_unfold(SseFragments::new(inner), |mut state| async move {
        loop {
            if let Some(fragment) = state.next_complete_fragment()? {
                return Ok(Some((fragment, state)));
            }
            if state.finished {
                return Ok(None);
            }
            match state.inner.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    return Err(DomainError::external(format!("response stream failed: {e}")))
                }
                None => {
                    let tail = state.drain_tail()?;
                    if let Some(fragment) = tail {
                        return Ok(Some((fragment, state)));
                    }
                    return Ok(None);
                }
            }
        }
    });

    Box::pin(stream)
}

/// Incremental parser for the `alt=sse` response framing: newline-delimited
/// `data: {json}` events, each holding one partial generation response.
struct SseFragments {
    inner: futures::stream::BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl SseFragments {
    fn new(
        inner: impl futures::Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
    ) -> Self {
        Self {
            inner: inner.boxed(),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Pops complete lines off the buffer until one yields text.
    fn next_complete_fragment(&mut self) -> Result<Option<String>, DomainError> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(text) = parse_sse_line(&line)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    /// Handles a final event not terminated by a newline.
    fn drain_tail(&mut self) -> Result<Option<String>, DomainError> {
        if self.finished {
            return Ok(None);
        }
        self.finished = true;
        let line = std::mem::take(&mut self.buffer);
        parse_sse_line(&line)
    }
}

fn parse_sse_line(line: &[u8]) -> Result<Option<String>, DomainError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }

    let parsed: GenerateResponse = serde_json::from_str(payload)
        .map_err(|e| DomainError::external(format!("malformed stream event: {e}")))?;
    Ok(parsed.first_text().filter(|t| !t.is_empty()))
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let url = self.url(&self.embedding_model, "embedContent");
        let body = EmbedBody {
            model: format!("models/{}", self.embedding_model),
            content: WireContent {
                parts: vec![WirePart::text(text)],
            },
        };

        let response = self.post_with_retry(&url, &body).await?;
        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| DomainError::external(format!("malformed embedding response: {e}")))?;

        Ok(Embedding::new(parsed.embedding.values))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url(&self.embedding_model, "batchEmbedContents");
        let body = BatchEmbedBody {
            requests: texts
                .iter()
                .map(|text| EmbedBody {
                    model: format!("models/{}", self.embedding_model),
                    content: WireContent {
                        parts: vec![WirePart::text(*text)],
                    },
                })
                .collect(),
        };

        let response = self.post_with_retry(&url, &body).await?;
        let parsed: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| DomainError::external(format!("malformed embedding response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(DomainError::external(format!(
                "embedding service returned {} vectors for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed
            .embeddings
            .into_iter()
            .map(|e| Embedding::new(e.values))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// Wire types for the REST payloads.

#[derive(Debug, Serialize)]
struct GenerateBody {
    contents: Vec<WireContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireContent {
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl WirePart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => WirePart::text(text.clone()),
            Part::Inline { mime_type, data } => WirePart {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: mime_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(data),
                }),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        Some(text)
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedBody {
    model: String,
    content: WireContent,
}

#[derive(Debug, Serialize)]
struct BatchEmbedBody {
    requests: Vec<EmbedBody>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_line_extracts_text() {
        let line = br#"data: {"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#;
        let fragment = parse_sse_line(line).unwrap();
        assert_eq!(fragment.as_deref(), Some("hello"));
    }

    #[test]
    fn test_parse_sse_line_skips_non_data_lines() {
        assert!(parse_sse_line(b"").unwrap().is_none());
        assert!(parse_sse_line(b": keep-alive").unwrap().is_none());
        assert!(parse_sse_line(b"data: [DONE]").unwrap().is_none());
    }

    #[test]
    fn test_parse_sse_line_rejects_malformed_event() {
        let err = parse_sse_line(b"data: {not json").unwrap_err();
        assert!(matches!(err, DomainError::ExternalService(_)));
    }

    #[test]
    fn test_classify_status_auth_is_fatal() {
        let err = classify_status(reqwest::StatusCode::FORBIDDEN, "denied");
        assert!(matches!(err, DomainError::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_status_quota_and_server_errors_retry() {
        assert!(classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(classify_status(reqwest::StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(!classify_status(reqwest::StatusCode::UNPROCESSABLE_ENTITY, "").is_retryable());
    }

    /// Yields its chunks once and panics if polled after completion, the
    /// way a real response body must not be.
    struct ChunkedBody {
        chunks: std::vec::IntoIter<bytes::Bytes>,
        done: bool,
    }

    impl ChunkedBody {
        fn new(chunks: Vec<&'static [u8]>) -> Self {
            Self {
                chunks: chunks
                    .into_iter()
                    .map(bytes::Bytes::from_static)
                    .collect::<Vec<_>>()
                    .into_iter(),
                done: false,
            }
        }
    }

    impl futures::Stream for ChunkedBody {
        type Item = reqwest::Result<bytes::Bytes>;

        fn poll_next(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Self::Item>> {
            let this = self.get_mut();
            if this.done {
                panic!("body polled after completion");
            }
            match this.chunks.next() {
                Some(chunk) => std::task::Poll::Ready(Some(Ok(chunk))),
                None => {
                    this.done = true;
                    std::task::Poll::Ready(None)
                }
            }
        }
    }

    #[tokio::test]
    async fn test_fragment_stream_handles_unterminated_tail() {
        let body = ChunkedBody::new(vec![
            b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"one\"}]}}]}\n",
            b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"two\"}]}}]}",
        ]);

        let mut stream = fragment_stream(body);
        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment.unwrap());
        }
        assert_eq!(fragments, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_fragment_stream_splits_events_across_chunks() {
        let body = ChunkedBody::new(vec![
            b"data: {\"candidates\":[{\"content\":",
            b"{\"parts\":[{\"text\":\"joined\"}]}}]}\n",
        ]);

        let mut stream = fragment_stream(body);
        assert_eq!(stream.next().await.unwrap().unwrap(), "joined");
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_inline_parts_are_base64_encoded() {
        let request = GenerateRequest::text("what is in this image?")
            .with_inline("image/png", vec![1, 2, 3]);
        let parts: Vec<WirePart> = request.parts.iter().map(WirePart::from).collect();

        assert_eq!(parts.len(), 2);
        let inline = parts[1].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "AQID");
    }
}
