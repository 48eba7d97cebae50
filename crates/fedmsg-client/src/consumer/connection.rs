use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;

use super::*;

/// Outgoing subscription frame.
#[derive(Debug, Serialize)]
struct SubscribeFrame<'a> {
    subscribe: &'a str,
}

/// Incoming relay frame. The relay wraps each bus message in an
/// envelope whose `topic` mirrors the zmq topic.
#[derive(Debug, Deserialize)]
struct RelayFrame {
    topic: String,
    #[serde(alias = "msg")]
    body: serde_json::Value,
    #[serde(default)]
    timestamp: Option<f64>,
}

impl FedmsgConsumer {
    pub(super) async fn connect_once(
        config: &ConsumerConfig,
        message_tx: &mpsc::Sender<BusMessage>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> Result<(), FedmsgError> {
        use tokio_tungstenite::tungstenite::Message as Msg;

        tracing::info!(relay_url = %config.relay_url, "Connecting to fedmsg relay");
        let (mut ws, _) = connect_async(&config.relay_url).await?;

        for topic in &config.topics {
            let frame = serde_json::to_string(&SubscribeFrame { subscribe: topic })?;
            ws.send(Msg::Text(frame.into())).await?;
            tracing::info!(topic, "Subscribed to relay topic");
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Relay shutdown during listen");
                    let _ = ws.close(None).await;
                    return Ok(());
                }
                result = tokio::time::timeout(KEEPALIVE_TIMEOUT, ws.next()) => {
                    match result {
                        Ok(Some(Ok(Msg::Text(text)))) => {
                            Self::handle_frame(&text, message_tx).await;
                        }
                        Ok(Some(Ok(Msg::Ping(data)))) => {
                            let _ = ws.send(Msg::Pong(data)).await;
                        }
                        Ok(Some(Ok(Msg::Close(_)))) | Ok(None) => {
                            tracing::warn!("Relay WebSocket closed by server");
                            return Err(FedmsgError::Relay("Server closed".into()));
                        }
                        Ok(Some(Err(e))) => return Err(FedmsgError::WebSocket(e)),
                        Ok(Some(Ok(_))) => {}
                        Err(_) => {
                            // No traffic and no ping inside the keepalive window.
                            tracing::warn!("Relay keepalive timeout");
                            return Err(FedmsgError::Timeout);
                        }
                    }
                }
            }
        }
    }

    /// Decode one relay frame and forward it. Malformed frames are
    /// dropped with a warning; the connection stays up.
    async fn handle_frame(text: &str, message_tx: &mpsc::Sender<BusMessage>) {
        match Self::parse_frame(text) {
            Ok(message) => {
                tracing::trace!(topic = %message.topic, "Relay message received");
                let _ = message_tx.send(message).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed relay frame");
            }
        }
    }

    pub(super) fn parse_frame(text: &str) -> Result<BusMessage, FedmsgError> {
        let frame: RelayFrame = serde_json::from_str(text)?;
        let timestamp = frame
            .timestamp
            .and_then(|secs| chrono::DateTime::from_timestamp(secs as i64, 0));
        Ok(BusMessage {
            topic: frame.topic,
            body: frame.body,
            timestamp,
        })
    }
}
