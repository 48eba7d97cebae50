//! Daemon startup and wiring.
//!
//! Builds the settings store, the bus adapters, and the engine, then
//! bridges the relay consumer and the settings-change feed into the
//! service's routing loop.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use fedmsg_client::{BusMessage, FedmsgConsumer};
use notify_db::SettingsDb;
use notify_db::keys;
use notify_engine::capabilities::{
    HttpIconFetcher, NotificationPresenter, ServiceIdentity, SignalEmitter,
};
use notify_engine::processors::ProcessorRegistry;
use notify_engine::{
    ControlEvent, Dispatcher, IconCache, Message, NotifyService, SettingsSnapshot,
};

use crate::config::AppConfig;
use crate::dbus::{self, BusIdentity, BusSignalEmitter, DesktopNotifier, NotifyControl};

const MESSAGE_CHANNEL_CAPACITY: usize = 256;
const CONTROL_CHANNEL_CAPACITY: usize = 8;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load();
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let db = SettingsDb::open(config.settings_db_path())?;
    let processors = Arc::new(ProcessorRegistry::with_defaults());
    seed_defaults(&db, &processors)?;
    // Subscribe before the initial read so a write landing between the
    // two still produces a change event.
    let changes = db.subscribe();
    let initial = snapshot(&db)?;

    let connection = zbus::Connection::session().await?;
    let presenter: Arc<dyn NotificationPresenter> =
        Arc::new(DesktopNotifier::new(&connection).await?);
    let signals: Arc<dyn SignalEmitter> = Arc::new(BusSignalEmitter::new(connection.clone()));
    let identity: Arc<dyn ServiceIdentity> = Arc::new(BusIdentity::new(connection.clone()));

    let icons = Arc::new(IconCache::new(
        config.icon_cache_dir(),
        Arc::new(HttpIconFetcher::new()),
    ));
    let dispatcher = Dispatcher::new(
        Arc::clone(&icons),
        Arc::clone(&presenter),
        signals,
    );

    let mut service = NotifyService::new(
        processors,
        icons,
        dispatcher,
        presenter,
        identity,
    );
    if !service.start(&initial).await? {
        // Disabled by configuration, or another instance holds the name.
        return Ok(());
    }

    let (ctl_tx, ctl_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
    connection
        .object_server()
        .at(dbus::OBJECT_PATH, NotifyControl::new(ctl_tx.clone()))
        .await?;

    let (bus_rx, consumer_shutdown) = FedmsgConsumer::connect(config.consumer_config())?;
    let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
    tokio::spawn(forward_messages(bus_rx, msg_tx));

    let (set_tx, set_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
    tokio::spawn(watch_settings(db.clone(), changes, set_tx));

    let interrupt_ctl = ctl_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            let _ = interrupt_ctl.send(ControlEvent::Disable).await;
        }
    });

    service.run(msg_rx, set_rx, ctl_rx).await;
    let _ = consumer_shutdown.send(()).await;
    Ok(())
}

/// Write first-run defaults for any key that has never been set.
/// The topic tier starts with every known processor enabled.
fn seed_defaults(db: &SettingsDb, processors: &ProcessorRegistry) -> Result<(), notify_db::DbError> {
    db.seed_default(keys::ENABLED, "true")?;
    db.seed_default(keys::EMIT_SIGNALS, "false")?;
    db.seed_default(keys::ENABLED_FILTERS, "[]")?;
    let all_services: Vec<&str> = processors.iter().map(|p| p.name()).collect();
    let json = serde_json::to_string(&all_services).unwrap_or_else(|_| "[]".into());
    db.seed_default(keys::ENABLED_SERVICES, &json)?;
    db.seed_default(keys::FILTER_SETTINGS, "{}")?;
    Ok(())
}

fn snapshot(db: &SettingsDb) -> Result<SettingsSnapshot, notify_db::DbError> {
    Ok(SettingsSnapshot {
        enabled: db.is_enabled()?,
        emit_signals: db.emit_signals()?,
        enabled_filters: db.enabled_filters()?,
        enabled_services: db.enabled_services()?,
        filter_settings: db.filter_settings()?,
    })
}

async fn forward_messages(mut bus_rx: mpsc::Receiver<BusMessage>, engine_tx: mpsc::Sender<Message>) {
    while let Some(bus_message) = bus_rx.recv().await {
        let message = Message::new(bus_message.topic, bus_message.body);
        if engine_tx.send(message).await.is_err() {
            return;
        }
    }
}

/// Rebuild and push a full settings snapshot on every change event.
/// The receiver is subscribed before the initial snapshot is read, so
/// writes racing startup are never lost.
async fn watch_settings(
    db: SettingsDb,
    mut changes: broadcast::Receiver<notify_db::SettingChange>,
    tx: mpsc::Sender<SettingsSnapshot>,
) {
    loop {
        match changes.recv().await {
            Ok(change) => tracing::debug!(key = %change.key, "Setting changed"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // A full snapshot subsumes whatever was missed.
                tracing::warn!(skipped, "Settings watcher lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
        match snapshot(&db) {
            Ok(current) => {
                if tx.send(current).await.is_err() {
                    return;
                }
            }
            Err(e) => tracing::warn!(error = %e, "Could not read settings after change"),
        }
    }
}
