//! Notification dispatch engine.
//!
//! Routes bus messages through a two-tier filter chain (advanced
//! content filters, then topic-pattern filters), resolves icon
//! resources through a deduplicating on-disk cache, and surfaces each
//! match as a desktop notification plus an optional local signal.
//!
//! The transport, the settings store, and the desktop surfaces are
//! external collaborators injected through the traits in
//! [`capabilities`].

pub mod capabilities;
pub mod dispatch;
pub mod filters;
pub mod icon_cache;
pub mod processors;
pub mod registry;
pub mod router;
pub mod service;

use serde::{Deserialize, Serialize};

pub use dispatch::Dispatcher;
pub use icon_cache::IconCache;
pub use registry::FilterRegistry;
pub use router::RouteMatch;
pub use service::{ControlEvent, NotifyService, ServiceState, SettingsSnapshot};

/// A decoded message from the upstream bus. One pass through the
/// pipeline; not retained afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub body: serde_json::Value,
}

impl Message {
    pub fn new(topic: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            body,
        }
    }
}

/// Human-readable fields rendered from a message by a processor.
/// Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub title: String,
    pub subtitle: String,
    pub link: String,
    pub icon_url: String,
    pub secondary_icon_url: String,
}

/// Unified error type for the notify-engine crate.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("icon fetch for {url} failed: {reason}")]
    IconFetch { url: String, reason: String },

    #[error("message body is missing {0}")]
    MalformedBody(&'static str),

    #[error("presentation failed: {0}")]
    Presentation(String),

    #[error("signal emission failed: {0}")]
    Signal(String),

    #[error("service identity error: {0}")]
    Identity(String),
}
