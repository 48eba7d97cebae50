//! Relay consumer loop.
//!
//! Connects to the websocket relay, sends topic subscriptions, and
//! forwards decoded messages. Reconnects with exponential backoff and
//! gives up for a full re-initialization after too many consecutive
//! failures.

mod connection;
#[cfg(test)]
mod tests;

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::{BusMessage, DEFAULT_RELAY_URL, DEFAULT_TOPIC_PATTERN, FedmsgError};

const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);
const BASE_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const FAILURE_RESET_WINDOW: Duration = Duration::from_secs(5 * 60);
const MAX_CONSECUTIVE_FAILURES: u32 = 8;
const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Relay consumer configuration.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub relay_url: String,
    pub topics: Vec<String>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            topics: vec![DEFAULT_TOPIC_PATTERN.to_string()],
        }
    }
}

/// Relay consumer with auto-reconnect.
///
/// Messages are delivered via `mpsc::Receiver<BusMessage>`.
pub struct FedmsgConsumer;

impl FedmsgConsumer {
    /// Start the consumer loop. Returns a message receiver and shutdown sender.
    pub fn connect(
        config: ConsumerConfig,
    ) -> Result<(mpsc::Receiver<BusMessage>, mpsc::Sender<()>), FedmsgError> {
        url::Url::parse(&config.relay_url)?;
        let (message_tx, message_rx) = mpsc::channel::<BusMessage>(MESSAGE_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(Self::run_loop(config, message_tx, shutdown_rx));
        Ok((message_rx, shutdown_tx))
    }

    async fn run_loop(
        config: ConsumerConfig,
        message_tx: mpsc::Sender<BusMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut failures: u32 = 0;
        let mut last_failure_at: Option<Instant> = None;
        loop {
            if shutdown_rx.try_recv().is_ok() {
                tracing::info!("Relay consumer shutdown requested");
                return;
            }
            if let Some(last_failure) = last_failure_at {
                if last_failure.elapsed() >= FAILURE_RESET_WINDOW {
                    if failures > 0 {
                        tracing::info!(failures, "Relay failures reset after stable interval");
                    }
                    failures = 0;
                    last_failure_at = None;
                }
            }
            match Self::connect_once(&config, &message_tx, &mut shutdown_rx).await {
                Ok(()) => {
                    tracing::info!("Relay connection closed cleanly");
                    return;
                }
                Err(e) => {
                    failures += 1;
                    last_failure_at = Some(Instant::now());
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        tracing::warn!(
                            failures,
                            "Relay failures exceeded threshold; giving up until re-enabled"
                        );
                        return;
                    }
                    let backoff = Self::backoff_duration(failures);
                    tracing::warn!(
                        error = %e, attempt = failures,
                        backoff_secs = backoff.as_secs(),
                        "Relay connection failed, will reconnect"
                    );
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Relay shutdown requested during reconnect backoff");
                            return;
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
    }

    fn backoff_duration(failures: u32) -> Duration {
        let d = BASE_BACKOFF * 2u32.saturating_pow(failures.saturating_sub(1));
        d.min(MAX_BACKOFF)
    }
}
