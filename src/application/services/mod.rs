mod analysis;
mod events;
mod retrieval;

pub use analysis::AnalysisService;
pub use events::EventService;
pub use retrieval::{IngestSummary, RetrievalService, NO_RELEVANT_INFORMATION};
