//! Runtime configuration: data directory and relay endpoint.

use std::path::PathBuf;

use fedmsg_client::{ConsumerConfig, DEFAULT_RELAY_URL, DEFAULT_TOPIC_PATTERN};

/// Runtime configuration, environment-first.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub relay_url: String,
    pub topics: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Self {
        load_dotenv();
        Self {
            data_dir: data_dir(),
            relay_url: std::env::var("FEDMSG_RELAY_URL")
                .unwrap_or_else(|_| DEFAULT_RELAY_URL.to_string()),
            topics: std::env::var("FEDMSG_TOPICS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_else(|_| vec![DEFAULT_TOPIC_PATTERN.to_string()]),
        }
    }

    pub fn settings_db_path(&self) -> PathBuf {
        self.data_dir.join("settings.db")
    }

    pub fn icon_cache_dir(&self) -> PathBuf {
        self.data_dir.join("icons")
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            relay_url: self.relay_url.clone(),
            topics: self.topics.clone(),
        }
    }
}

/// Determine the data directory for the daemon.
/// Priority: FEDMSG_NOTIFY_DATA_DIR env var > ~/.fedmsg-notify
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FEDMSG_NOTIFY_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fedmsg-notify")
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::debug!("No .env file found, using system environment variables");
}
