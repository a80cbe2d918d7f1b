pub mod config;
pub mod extract;
pub mod gemini;
pub mod index;
pub mod store;

pub use config::Config;
pub use gemini::GeminiClient;
pub use index::LocalVectorIndex;
pub use store::{FileHistoryArchive, JsonEventStore};
