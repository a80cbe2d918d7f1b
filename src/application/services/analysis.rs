use std::sync::Arc;

use futures::StreamExt;
use tracing::instrument;

use crate::domain::ports::{GenerateRequest, GenerativeModel, HistoryArchive};
use crate::domain::{prompt, DomainError, ImageSession, SessionRecord};
use crate::infrastructure::extract::MIME_PDF;

const IMAGE_MIMES: &[&str] = &["image/jpeg", "image/png"];

/// Direct prompt-response flows: image analysis with follow-up conversation,
/// invoice extraction, resume evaluation, and the scope-limited IT assistant.
/// Each operation is one remote call; the only side effects are history
/// writes.
pub struct AnalysisService {
    model: Arc<dyn GenerativeModel>,
    archive: Arc<dyn HistoryArchive>,
}

impl AnalysisService {
    pub fn new(model: Arc<dyn GenerativeModel>, archive: Arc<dyn HistoryArchive>) -> Self {
        Self { model, archive }
    }

    fn check_image_mime(mime_type: &str) -> Result<(), DomainError> {
        if IMAGE_MIMES.contains(&mime_type) {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "unsupported image type '{mime_type}'; expected one of {IMAGE_MIMES:?}"
            )))
        }
    }

    /// Creates a new image session from an upload: describes the image and
    /// returns the session holding the bytes for follow-up questions.
    #[instrument(skip(self, image), fields(image_name, mime_type))]
    pub async fn open_image_session(
        &self,
        image_name: &str,
        mime_type: &str,
        image: Vec<u8>,
    ) -> Result<ImageSession, DomainError> {
        Self::check_image_mime(mime_type)?;
        if image.is_empty() {
            return Err(DomainError::validation("image upload is empty"));
        }

        let rendered = prompt::IMAGE_DESCRIBE.render(&[])?;
        let request = GenerateRequest::text(rendered).with_inline(mime_type, image.clone());
        let description = self.model.generate(&request).await?;

        Ok(ImageSession::new(image_name, mime_type, image, description))
    }

    /// Answers a follow-up question about the session's image, carrying the
    /// prior turns as context, then appends the turn and re-archives the
    /// session.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn ask_image(
        &self,
        session: &mut ImageSession,
        question: &str,
    ) -> Result<String, DomainError> {
        if question.trim().is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }

        let rendered = if session.turns.is_empty() {
            prompt::IMAGE_QUESTION.render(&[("question", question)])?
        } else {
            let context = session.context_block();
            prompt::IMAGE_FOLLOW_UP.render(&[("context", &context), ("question", question)])?
        };

        let request = GenerateRequest::text(rendered)
            .with_inline(session.mime_type.clone(), session.image.clone());
        let answer = self.model.generate(&request).await?;

        session.add_turn(question, answer.clone());
        self.archive.save_session(&session.to_record()).await?;

        Ok(answer)
    }

    /// Invoice Q&A over an attached invoice image.
    #[instrument(skip(self, image), fields(mime_type))]
    pub async fn analyze_invoice(
        &self,
        mime_type: &str,
        image: Vec<u8>,
        question: &str,
    ) -> Result<String, DomainError> {
        Self::check_image_mime(mime_type)?;
        let rendered = prompt::INVOICE_ANALYST.render(&[("question", question)])?;
        let request = GenerateRequest::text(rendered).with_inline(mime_type, image);
        self.model.generate(&request).await
    }

    /// HR-style review of a resume PDF against a job description.
    #[instrument(skip(self, resume_pdf, job_description))]
    pub async fn evaluate_resume(
        &self,
        resume_pdf: Vec<u8>,
        job_description: &str,
    ) -> Result<String, DomainError> {
        let rendered = prompt::RESUME_REVIEW.render(&[("job_description", job_description)])?;
        let request = GenerateRequest::text(rendered).with_inline(MIME_PDF, resume_pdf);
        self.model.generate(&request).await
    }

    /// ATS-style match percentage of a resume PDF against a job description.
    #[instrument(skip(self, resume_pdf, job_description))]
    pub async fn match_resume(
        &self,
        resume_pdf: Vec<u8>,
        job_description: &str,
    ) -> Result<String, DomainError> {
        let rendered = prompt::ATS_MATCH.render(&[("job_description", job_description)])?;
        let request = GenerateRequest::text(rendered).with_inline(MIME_PDF, resume_pdf);
        self.model.generate(&request).await
    }

    /// The scope-limited IT assistant. The question is logged, the response
    /// is streamed from the model, and the fragments are accumulated into one
    /// string before returning.
    #[instrument(skip(self))]
    pub async fn answer_it_question(&self, question: &str) -> Result<String, DomainError> {
        if question.trim().is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }

        self.archive.log_question(question).await?;

        let rendered = prompt::IT_SCOPE.render(&[("question", question)])?;
        let mut stream = self
            .model
            .generate_stream(&GenerateRequest::text(rendered))
            .await?;

        let mut answer = String::new();
        while let Some(fragment) = stream.next().await {
            answer.push_str(&fragment?);
        }

        Ok(answer)
    }

    pub async fn list_history(&self) -> Result<Vec<String>, DomainError> {
        self.archive.list_sessions().await
    }

    pub async fn load_history(&self, name: &str) -> Result<SessionRecord, DomainError> {
        self.archive.load_session(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::domain::ports::{FragmentStream, Part};

    #[derive(Default)]
    struct ScriptedModel {
        requests: Mutex<Vec<GenerateRequest>>,
        fragments: Vec<&'static str>,
    }

    impl ScriptedModel {
        fn streaming(fragments: Vec<&'static str>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fragments,
            }
        }

        fn last_request(&self) -> GenerateRequest {
            self.requests.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, request: &GenerateRequest) -> Result<String, DomainError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok("model reply".to_string())
        }

        async fn generate_stream(
            &self,
            request: &GenerateRequest,
        ) -> Result<FragmentStream, DomainError> {
            self.requests.lock().unwrap().push(request.clone());
            let items: Vec<Result<String, DomainError>> = self
                .fragments
                .iter()
                .map(|f| Ok((*f).to_string()))
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    #[derive(Default)]
    struct MemoryArchive {
        sessions: Mutex<Vec<SessionRecord>>,
        questions: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HistoryArchive for MemoryArchive {
        async fn save_session(&self, record: &SessionRecord) -> Result<String, DomainError> {
            self.sessions.lock().unwrap().push(record.clone());
            Ok(record.image_name.clone())
        }

        async fn list_sessions(&self) -> Result<Vec<String>, DomainError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.image_name.clone())
                .collect())
        }

        async fn load_session(&self, name: &str) -> Result<SessionRecord, DomainError> {
            self.sessions
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.image_name == name)
                .cloned()
                .ok_or_else(|| DomainError::not_found("session"))
        }

        async fn log_question(&self, question: &str) -> Result<(), DomainError> {
            self.questions.lock().unwrap().push(question.to_string());
            Ok(())
        }
    }

    fn prompt_text(request: &GenerateRequest) -> String {
        request
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.clone()),
                Part::Inline { .. } => None,
            })
            .collect()
    }

    fn inline_part(request: &GenerateRequest) -> Option<(String, usize)> {
        request.parts.iter().find_map(|p| match p {
            Part::Inline { mime_type, data } => Some((mime_type.clone(), data.len())),
            Part::Text(_) => None,
        })
    }

    #[tokio::test]
    async fn test_open_image_session_describes_image() {
        let model = Arc::new(ScriptedModel::default());
        let svc = AnalysisService::new(model.clone(), Arc::new(MemoryArchive::default()));

        let session = svc
            .open_image_session("photo", "image/png", vec![9; 32])
            .await
            .unwrap();

        assert_eq!(session.description, "model reply");
        let request = model.last_request();
        assert!(prompt_text(&request).starts_with("Describe this image"));
        assert_eq!(inline_part(&request), Some(("image/png".to_string(), 32)));
    }

    #[tokio::test]
    async fn test_open_image_session_rejects_bad_mime() {
        let svc = AnalysisService::new(
            Arc::new(ScriptedModel::default()),
            Arc::new(MemoryArchive::default()),
        );

        let err = svc
            .open_image_session("clip", "video/mp4", vec![1])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_ask_image_appends_turn_and_archives() {
        let model = Arc::new(ScriptedModel::default());
        let archive = Arc::new(MemoryArchive::default());
        let svc = AnalysisService::new(model.clone(), archive.clone());

        let mut session = ImageSession::new("photo", "image/jpeg", vec![1, 2], "a cat");
        svc.ask_image(&mut session, "what breed?").await.unwrap();
        svc.ask_image(&mut session, "how old?").await.unwrap();

        assert_eq!(session.turns.len(), 2);
        // Second call carries the first turn as context.
        let request = model.last_request();
        let text = prompt_text(&request);
        assert!(text.contains("Q: what breed?"));
        assert!(text.contains("New question: how old?"));

        // Archived after every answered question.
        assert_eq!(archive.sessions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resume_flows_attach_pdf() {
        let model = Arc::new(ScriptedModel::default());
        let svc = AnalysisService::new(model.clone(), Arc::new(MemoryArchive::default()));

        svc.evaluate_resume(vec![5; 64], "Senior Rust engineer")
            .await
            .unwrap();
        let request = model.last_request();
        assert!(prompt_text(&request).contains("Technical Human Resource Manager"));
        assert_eq!(
            inline_part(&request),
            Some(("application/pdf".to_string(), 64))
        );

        svc.match_resume(vec![5; 64], "Senior Rust engineer")
            .await
            .unwrap();
        assert!(prompt_text(&model.last_request()).contains("ATS scanner"));
    }

    #[tokio::test]
    async fn test_it_question_accumulates_fragments_and_logs() {
        let model = Arc::new(ScriptedModel::streaming(vec!["DNS ", "resolves ", "names."]));
        let archive = Arc::new(MemoryArchive::default());
        let svc = AnalysisService::new(model, archive.clone());

        let answer = svc.answer_it_question("what is DNS?").await.unwrap();
        assert_eq!(answer, "DNS resolves names.");
        assert_eq!(
            archive.questions.lock().unwrap().as_slice(),
            &["what is DNS?".to_string()]
        );
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected_before_logging() {
        let archive = Arc::new(MemoryArchive::default());
        let svc = AnalysisService::new(Arc::new(ScriptedModel::default()), archive.clone());

        let err = svc.answer_it_question("  ").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(archive.questions.lock().unwrap().is_empty());
    }
}
