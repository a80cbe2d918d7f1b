use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::domain::errors::DomainError;

/// One part of a generation request: prompt text, or inline binary content
/// (an image, or a PDF attached with its mime type).
#[derive(Debug, Clone)]
pub enum Part {
    Text(String),
    Inline { mime_type: String, data: Vec<u8> },
}

/// A request against the remote text-generation endpoint.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub parts: Vec<Part>,
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(prompt.into())],
            temperature: None,
        }
    }

    pub fn with_inline(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.parts.push(Part::Inline {
            mime_type: mime_type.into(),
            data,
        });
        self
    }

    pub fn with_text(mut self, prompt: impl Into<String>) -> Self {
        self.parts.push(Part::Text(prompt.into()));
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A lazy, finite, non-restartable sequence of response text fragments.
/// Dropping the stream cancels the remote call.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, DomainError>> + Send>>;

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Returns the complete response text for a request.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, DomainError>;

    /// Returns the response as a stream of text fragments. Consumers
    /// concatenate fragments until the stream ends or errors.
    async fn generate_stream(&self, request: &GenerateRequest)
        -> Result<FragmentStream, DomainError>;
}
