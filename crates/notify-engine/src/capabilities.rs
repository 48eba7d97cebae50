//! Capability traits for the engine's external collaborators.
//!
//! The daemon binary supplies the real D-Bus and HTTP implementations;
//! tests supply fakes.

use std::path::Path;

use async_trait::async_trait;

use crate::EngineError;

/// Presents a desktop notification.
#[async_trait]
pub trait NotificationPresenter: Send + Sync {
    async fn show(
        &self,
        title: &str,
        body: &str,
        icon: Option<&Path>,
        secondary_icon: Option<&Path>,
    ) -> Result<(), EngineError>;
}

/// Re-emits a matched message to local subscribers.
#[async_trait]
pub trait SignalEmitter: Send + Sync {
    async fn emit(&self, topic: &str, body: &str) -> Result<(), EngineError>;
}

/// Exclusive claim on the daemon's well-known service identity.
///
/// A second instance must see `try_claim` return false and refuse to
/// start; this is the intended outcome, not a failure.
#[async_trait]
pub trait ServiceIdentity: Send + Sync {
    async fn try_claim(&self) -> Result<bool, EngineError>;
    async fn release(&self) -> Result<(), EngineError>;
}

/// Downloads one icon resource to a local path.
#[async_trait]
pub trait IconFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), EngineError>;
}

/// Default fetcher backed by reqwest.
pub struct HttpIconFetcher {
    client: reqwest::Client,
}

impl HttpIconFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpIconFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IconFetcher for HttpIconFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), EngineError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(EngineError::IconFetch {
                url: url.to_string(),
                reason: format!("HTTP status {}", response.status()),
            });
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}
