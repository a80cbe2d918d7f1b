use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::application::{AnalysisService, EventService, RetrievalService};
use crate::domain::ImageSession;
use crate::infrastructure::Config;

/// Registry of live image-analysis sessions. Sessions are created when an
/// image is uploaded and removed on explicit delete; they do not survive a
/// restart (only their archived records do).
///
/// Each session carries its own mutex so questions serialize per session.
/// The registry lock is held only for lookup, insert, and remove; never
/// across a remote call.
pub type SessionRegistry = Arc<RwLock<HashMap<Uuid, Arc<Mutex<ImageSession>>>>>;

#[derive(Clone)]
pub struct AppState {
    pub retrieval: Arc<RetrievalService>,
    pub events: Arc<EventService>,
    pub analysis: Arc<AnalysisService>,
    pub sessions: SessionRegistry,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        retrieval: Arc<RetrievalService>,
        events: Arc<EventService>,
        analysis: Arc<AnalysisService>,
        config: Config,
    ) -> Self {
        Self {
            retrieval,
            events,
            analysis,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
        }
    }
}
