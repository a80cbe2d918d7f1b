mod embedding;
mod event_store;
mod generative;
mod history;
mod vector_index;

pub use embedding::Embedder;
pub use event_store::EventStore;
pub use generative::{FragmentStream, GenerateRequest, GenerativeModel, Part};
pub use history::HistoryArchive;
pub use vector_index::VectorIndex;
