//! Notification dispatch.
//!
//! Joins the icon fetches for a matched message, renders it through
//! its processor, and hands the result to the desktop presenter.
//! Nothing in here is allowed to raise past the dispatch boundary: a
//! failure means the notification is skipped, and the next matching
//! message is unaffected.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::capabilities::{NotificationPresenter, SignalEmitter};
use crate::icon_cache::IconCache;
use crate::processors::Processor;
use crate::{Message, Rendered};

pub struct Dispatcher {
    icons: Arc<IconCache>,
    presenter: Arc<dyn NotificationPresenter>,
    signals: Arc<dyn SignalEmitter>,
    emit_signals: AtomicBool,
}

impl Dispatcher {
    pub fn new(
        icons: Arc<IconCache>,
        presenter: Arc<dyn NotificationPresenter>,
        signals: Arc<dyn SignalEmitter>,
    ) -> Self {
        Self {
            icons,
            presenter,
            signals,
            emit_signals: AtomicBool::new(false),
        }
    }

    pub fn set_emit_signals(&self, enabled: bool) {
        self.emit_signals.store(enabled, Ordering::Relaxed);
    }

    pub fn emit_signals(&self) -> bool {
        self.emit_signals.load(Ordering::Relaxed)
    }

    /// Emit and present one matched message.
    pub async fn dispatch(&self, message: &Message, processor: Option<&dyn Processor>) {
        if self.emit_signals() {
            self.emit_signal(message).await;
        }

        let Some(processor) = processor else {
            // Topic-tier match with an unclassifiable body; there is
            // nothing to render.
            tracing::debug!(topic = %message.topic, "No processor for matched message, skipping notification");
            return;
        };

        let rendered = match processor.render(message) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(topic = %message.topic, error = %e,
                    "Rendering failed, notification skipped");
                return;
            }
        };

        // Both icons settle before presenting; a failed icon degrades
        // to no icon rather than failing the notification.
        let (icon, secondary_icon) = tokio::join!(
            self.resolve_icon(&rendered.icon_url),
            self.resolve_icon(&rendered.secondary_icon_url),
        );

        let body = compose_body(&rendered);
        if let Err(e) = self
            .presenter
            .show(
                &rendered.title,
                &body,
                icon.as_deref(),
                secondary_icon.as_deref(),
            )
            .await
        {
            tracing::warn!(topic = %message.topic, error = %e,
                "Presentation failed, notification skipped");
        }
    }

    async fn emit_signal(&self, message: &Message) {
        let body = match serde_json::to_string(&message.body) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(topic = %message.topic, error = %e, "Could not serialize message body");
                return;
            }
        };
        if let Err(e) = self.signals.emit(&message.topic, &body).await {
            tracing::warn!(topic = %message.topic, error = %e, "Signal emission failed");
        }
    }

    async fn resolve_icon(&self, url: &str) -> Option<PathBuf> {
        match self.icons.resolve(url).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "Icon unavailable, showing without it");
                None
            }
        }
    }
}

/// Notification body: subtitle and link joined by a space, with
/// either side optional.
fn compose_body(rendered: &Rendered) -> String {
    match (rendered.subtitle.is_empty(), rendered.link.is_empty()) {
        (true, true) => String::new(),
        (false, true) => rendered.subtitle.clone(),
        (true, false) => rendered.link.clone(),
        (false, false) => format!("{} {}", rendered.subtitle, rendered.link),
    }
}
