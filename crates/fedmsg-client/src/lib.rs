//! WebSocket consumer for the fedmsg bus relay.
//!
//! Subscribes to topic patterns on the Fedora Infrastructure message
//! relay and delivers decoded messages over an mpsc channel, with
//! keepalive supervision and automatic reconnection.

pub mod consumer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use consumer::{ConsumerConfig, FedmsgConsumer};

/// Default public websocket relay endpoint.
pub const DEFAULT_RELAY_URL: &str = "wss://apps.fedoraproject.org/websocket";

/// Topic prefix covering all Fedora Infrastructure traffic.
pub const DEFAULT_TOPIC_PATTERN: &str = "org.fedoraproject.*";

/// A decoded message from the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    pub body: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Unified error type for the fedmsg-client crate.
#[derive(Debug, thiserror::Error)]
pub enum FedmsgError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Connection timeout")]
    Timeout,
}
