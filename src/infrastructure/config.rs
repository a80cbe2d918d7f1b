use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::errors::DomainError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub window_chars: usize,
    pub overlap_chars: usize,
    pub top_k: usize,
    pub sentiment_max_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("indexes")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.join("chat_history")
    }

    pub fn events_file(&self) -> PathBuf {
        self.data_dir.join("events.json")
    }

    pub fn question_log(&self) -> PathBuf {
        self.data_dir.join("questions.log")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                model: "gemini-2.0-flash".to_string(),
                temperature: 0.6,
                timeout_seconds: 60,
                max_retries: 3,
            },
            embedding: EmbeddingConfig {
                model: "embedding-001".to_string(),
                dimension: 768,
            },
            retrieval: RetrievalConfig {
                window_chars: 5000,
                overlap_chars: 500,
                top_k: 5,
                sentiment_max_chars: 20_000,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                allowed_origins: Vec::new(),
            },
        }
    }
}

impl Config {
    /// Loads configuration from the environment, starting from defaults.
    ///
    /// `GOOGLE_API_KEY` is the single credential variable; a missing key is a
    /// fatal configuration error reported once at startup.
    pub fn from_env() -> Result<(Self, String), DomainError> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| DomainError::configuration("GOOGLE_API_KEY is not set"))?;
        if api_key.trim().is_empty() {
            return Err(DomainError::configuration("GOOGLE_API_KEY is empty"));
        }

        let mut config = Config::default();

        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.llm.model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(seconds) = env_parse::<u64>("LLM_TIMEOUT_SECONDS")? {
            config.llm.timeout_seconds = seconds;
        }
        if let Some(retries) = env_parse::<u32>("LLM_MAX_RETRIES")? {
            config.llm.max_retries = retries;
        }
        if let Some(window) = env_parse::<usize>("RETRIEVAL_WINDOW_CHARS")? {
            config.retrieval.window_chars = window;
        }
        if let Some(overlap) = env_parse::<usize>("RETRIEVAL_OVERLAP_CHARS")? {
            config.retrieval.overlap_chars = overlap;
        }
        if let Some(top_k) = env_parse::<usize>("RETRIEVAL_TOP_K")? {
            config.retrieval.top_k = top_k;
        }
        if let Ok(dir) = std::env::var("DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(host) = std::env::var("SERVER_HOST") {
            config.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("SERVER_PORT")? {
            config.server.port = port;
        }
        if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
            config.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if config.retrieval.overlap_chars >= config.retrieval.window_chars {
            return Err(DomainError::configuration(
                "RETRIEVAL_OVERLAP_CHARS must be smaller than RETRIEVAL_WINDOW_CHARS",
            ));
        }

        Ok((config, api_key))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, DomainError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| DomainError::configuration(format!("invalid value for {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}
