use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One question/answer exchange. Turns are append-only; they are never edited
/// or deleted individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }
}

/// State for one image-analysis session: the uploaded image, its generated
/// description, and the ordered follow-up turns.
///
/// Created when an image is uploaded, cleared on explicit session delete.
/// The archived form (what the history store writes) omits the image bytes.
#[derive(Debug, Clone)]
pub struct ImageSession {
    pub id: Uuid,
    pub image_name: String,
    pub mime_type: String,
    pub image: Vec<u8>,
    pub description: String,
    pub turns: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
}

impl ImageSession {
    pub fn new(
        image_name: impl Into<String>,
        mime_type: impl Into<String>,
        image: Vec<u8>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_name: image_name.into(),
            mime_type: mime_type.into(),
            image,
            description: description.into(),
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn add_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn::new(question, answer));
    }

    /// Prior turns formatted as prompt context, oldest first.
    pub fn context_block(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("Q: {}\nA: {}", t.question, t.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            image_name: self.image_name.clone(),
            saved_at: Utc::now(),
            description: self.description.clone(),
            turns: self.turns.clone(),
        }
    }
}

/// The serialized form of an image-analysis session, one JSON file per
/// session in the history directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub image_name: String,
    pub saved_at: DateTime<Utc>,
    pub description: String,
    pub turns: Vec<ConversationTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_block_orders_turns() {
        let mut session = ImageSession::new("photo", "image/png", vec![1, 2, 3], "a photo");
        session.add_turn("what is it?", "a cat");
        session.add_turn("what color?", "black");

        let context = session.context_block();
        assert_eq!(
            context,
            "Q: what is it?\nA: a cat\nQ: what color?\nA: black"
        );
    }

    #[test]
    fn test_record_excludes_image_bytes() {
        let mut session = ImageSession::new("scan", "image/jpeg", vec![0xff; 16], "a scan");
        session.add_turn("total?", "42");

        let record = session.to_record();
        assert_eq!(record.image_name, "scan");
        assert_eq!(record.turns.len(), 1);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("image").is_none());
    }
}
