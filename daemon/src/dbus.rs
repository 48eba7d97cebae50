//! D-Bus adapters for the engine's capability traits.
//!
//! The daemon owns the well-known name `org.fedoraproject.fedmsg.notify`
//! on the session bus. Holding that name doubles as the singleton
//! claim: a second instance fails to acquire it and exits. Matched
//! messages can be re-emitted as a `MessageReceived` signal, and
//! notifications go through the standard `org.freedesktop.Notifications`
//! service.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;
use zbus::Connection;
use zbus::zvariant::Value;

use notify_engine::EngineError;
use notify_engine::capabilities::{NotificationPresenter, ServiceIdentity, SignalEmitter};
use notify_engine::service::ControlEvent;

pub const BUS_NAME: &str = "org.fedoraproject.fedmsg.notify";
pub const OBJECT_PATH: &str = "/org/fedoraproject/fedmsg/notify";
const SIGNAL_NAME: &str = "MessageReceived";

const NOTIFICATIONS_DEST: &str = "org.freedesktop.Notifications";
const NOTIFICATIONS_PATH: &str = "/org/freedesktop/Notifications";

/// Singleton claim backed by well-known bus-name ownership.
pub struct BusIdentity {
    connection: Connection,
}

impl BusIdentity {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ServiceIdentity for BusIdentity {
    async fn try_claim(&self) -> Result<bool, EngineError> {
        match self.connection.request_name(BUS_NAME).await {
            Ok(()) => Ok(true),
            Err(zbus::Error::NameTaken) => Ok(false),
            Err(e) => Err(EngineError::Identity(e.to_string())),
        }
    }

    async fn release(&self) -> Result<(), EngineError> {
        self.connection
            .release_name(BUS_NAME)
            .await
            .map(|_| ())
            .map_err(|e| EngineError::Identity(e.to_string()))
    }
}

/// Desktop notifications via `org.freedesktop.Notifications`.
pub struct DesktopNotifier {
    proxy: zbus::Proxy<'static>,
}

impl DesktopNotifier {
    pub async fn new(connection: &Connection) -> Result<Self, zbus::Error> {
        let proxy = zbus::Proxy::new(
            connection,
            NOTIFICATIONS_DEST,
            NOTIFICATIONS_PATH,
            NOTIFICATIONS_DEST,
        )
        .await?;
        Ok(Self { proxy })
    }
}

#[async_trait]
impl NotificationPresenter for DesktopNotifier {
    async fn show(
        &self,
        title: &str,
        body: &str,
        icon: Option<&Path>,
        secondary_icon: Option<&Path>,
    ) -> Result<(), EngineError> {
        let app_icon = icon.map(|p| p.display().to_string()).unwrap_or_default();
        let mut hints: HashMap<&str, Value<'_>> = HashMap::new();
        if let Some(secondary) = secondary_icon {
            hints.insert("image-path", Value::from(secondary.display().to_string()));
        }
        let _id: u32 = self
            .proxy
            .call(
                "Notify",
                &(
                    "fedmsg",       // app_name
                    0u32,           // replaces_id
                    app_icon,
                    title,
                    body,
                    Vec::<&str>::new(), // actions
                    hints,
                    -1i32, // expire_timeout: server default
                ),
            )
            .await
            .map_err(|e| EngineError::Presentation(e.to_string()))?;
        Ok(())
    }
}

/// Re-emits matched messages as a bus signal for local subscribers.
pub struct BusSignalEmitter {
    connection: Connection,
}

impl BusSignalEmitter {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl SignalEmitter for BusSignalEmitter {
    async fn emit(&self, topic: &str, body: &str) -> Result<(), EngineError> {
        self.connection
            .emit_signal(
                None::<zbus::names::BusName<'_>>,
                OBJECT_PATH,
                BUS_NAME,
                SIGNAL_NAME,
                &(topic, body),
            )
            .await
            .map_err(|e| EngineError::Signal(e.to_string()))
    }
}

/// The daemon's own bus interface: idempotent activation hooks.
pub struct NotifyControl {
    control: mpsc::Sender<ControlEvent>,
}

impl NotifyControl {
    pub fn new(control: mpsc::Sender<ControlEvent>) -> Self {
        Self { control }
    }
}

#[zbus::interface(name = "org.fedoraproject.fedmsg.notify")]
impl NotifyControl {
    /// No-op activation hook; starting the service happens at daemon
    /// startup, this only exists so activators have something to call.
    async fn enable(&self) {
        let _ = self.control.send(ControlEvent::Enable).await;
    }

    async fn disable(&self) {
        let _ = self.control.send(ControlEvent::Disable).await;
    }
}
