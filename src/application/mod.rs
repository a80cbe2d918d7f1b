//! Application layer - use cases and orchestration.
//!
//! Services here orchestrate domain logic against the domain ports (traits)
//! rather than concrete infrastructure implementations.

pub mod services;

pub use services::{AnalysisService, EventService, IngestSummary, RetrievalService};
