mod conversation;
mod embedding;
mod event;
mod window;

pub use conversation::{ConversationTurn, ImageSession, SessionRecord};
pub use embedding::Embedding;
pub use event::EventBook;
pub use window::{split_windows, DocumentWindow, ScoredWindow};
