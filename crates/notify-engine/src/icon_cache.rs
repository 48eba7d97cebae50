//! Content-addressed icon cache.
//!
//! Icons referenced by matched messages are downloaded once into a
//! dedicated cache directory under a filename derived from the URL, so
//! repeated runs reuse prior downloads. Concurrent requests for the
//! same URL attach to the single in-flight fetch instead of issuing a
//! second one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OnceCell};

use crate::EngineError;
use crate::capabilities::IconFetcher;

type FetchOutcome = Result<PathBuf, String>;

pub struct IconCache {
    dir: PathBuf,
    fetcher: Arc<dyn IconFetcher>,
    inflight: Mutex<HashMap<String, Arc<OnceCell<FetchOutcome>>>>,
}

impl IconCache {
    pub fn new(dir: PathBuf, fetcher: Arc<dyn IconFetcher>) -> Self {
        Self {
            dir,
            fetcher,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a URL to a local path.
    ///
    /// An empty URL resolves to `None` ("no icon", distinct from
    /// failure). A file already on disk short-circuits without network
    /// access. Otherwise the caller either starts the fetch or waits
    /// on the one already in flight.
    pub async fn resolve(&self, url: &str) -> Result<Option<PathBuf>, EngineError> {
        if url.is_empty() {
            return Ok(None);
        }
        let path = self.dir.join(file_name_for(url));
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Some(path));
        }

        let cell = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(inflight.entry(url.to_string()).or_default())
        };
        let outcome = cell
            .get_or_init(|| async {
                self.download(url, &path)
                    .await
                    .map(|()| path.clone())
                    .map_err(|e| e.to_string())
            })
            .await
            .clone();
        // Done either way; a later resolve hits the disk check or
        // retries after a failure.
        self.inflight.lock().await.remove(url);

        match outcome {
            Ok(path) => Ok(Some(path)),
            Err(reason) => Err(EngineError::IconFetch {
                url: url.to_string(),
                reason,
            }),
        }
    }

    async fn download(&self, url: &str, path: &Path) -> Result<(), EngineError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("part");
        tracing::debug!(url, "Downloading icon");
        match self.fetcher.fetch(url, &tmp).await {
            Ok(()) => {
                tokio::fs::rename(&tmp, path).await?;
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                Err(e)
            }
        }
    }

    /// Delete every cached file. Individual delete failures are
    /// logged and swallowed; teardown never raises.
    pub async fn purge_all(&self) {
        self.inflight.lock().await.clear();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(_) => return,
        };
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                        tracing::warn!(path = %entry.path().display(), error = %e,
                            "Failed to delete cached icon");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Icon cache purge interrupted");
                    break;
                }
            }
        }
        tracing::info!("Icon cache purged");
    }
}

/// Deterministic, collision-resistant cache filename for a URL:
/// sha256 of the URL string, keeping the URL's file extension so
/// the notification server can sniff the image type.
fn file_name_for(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    let path_part = url.split(['?', '#']).next().unwrap_or(url);
    match path_part.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!("{digest}.{ext}")
        }
        _ => digest,
    }
}
