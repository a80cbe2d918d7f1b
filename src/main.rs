use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gemini_assist::api::{create_router, AppState};
use gemini_assist::application::{AnalysisService, EventService, RetrievalService};
use gemini_assist::infrastructure::{
    Config, FileHistoryArchive, GeminiClient, JsonEventStore, LocalVectorIndex,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let (config, api_key) = Config::from_env()?;

    let gemini = Arc::new(GeminiClient::new(
        api_key,
        &config.llm,
        &config.embedding,
    )?);
    let index = Arc::new(LocalVectorIndex::new(config.storage.index_dir())?);
    let events_store = Arc::new(JsonEventStore::new(config.storage.events_file())?);
    let archive = Arc::new(FileHistoryArchive::new(
        config.storage.history_dir(),
        config.storage.question_log(),
    )?);
    info!(data_dir = %config.storage.data_dir.display(), "storage initialized");

    let retrieval = Arc::new(RetrievalService::new(
        gemini.clone(),
        index,
        gemini.clone(),
        config.retrieval.window_chars,
        config.retrieval.overlap_chars,
        config.retrieval.top_k,
        config.retrieval.sentiment_max_chars,
    ));
    let events = Arc::new(EventService::new(events_store, gemini.clone()));
    let analysis = Arc::new(AnalysisService::new(gemini, archive));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState::new(retrieval, events, analysis, config);
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
