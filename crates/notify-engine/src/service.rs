//! Daemon lifecycle controller.
//!
//! Owns the filter registry and drives the single routing loop:
//! messages, settings changes, and control events all arrive through
//! the same `select!`, so the filter list is mutated only by the task
//! that reads it and in-flight routing is never interrupted by a
//! reconfiguration.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::capabilities::{NotificationPresenter, ServiceIdentity};
use crate::dispatch::Dispatcher;
use crate::icon_cache::IconCache;
use crate::processors::ProcessorRegistry;
use crate::registry::FilterRegistry;
use crate::router;
use crate::{EngineError, Message};

/// One full view of the daemon's persisted settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsSnapshot {
    pub enabled: bool,
    pub emit_signals: bool,
    pub enabled_filters: Vec<String>,
    pub enabled_services: Vec<String>,
    pub filter_settings: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Claiming,
    Running,
    Stopped,
}

/// External activation hooks, marshalled onto the routing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Enable,
    Disable,
}

pub struct NotifyService {
    state: ServiceState,
    processors: Arc<ProcessorRegistry>,
    registry: FilterRegistry,
    icons: Arc<IconCache>,
    dispatcher: Dispatcher,
    presenter: Arc<dyn NotificationPresenter>,
    identity: Arc<dyn ServiceIdentity>,
}

impl NotifyService {
    pub fn new(
        processors: Arc<ProcessorRegistry>,
        icons: Arc<IconCache>,
        dispatcher: Dispatcher,
        presenter: Arc<dyn NotificationPresenter>,
        identity: Arc<dyn ServiceIdentity>,
    ) -> Self {
        Self {
            state: ServiceState::Uninitialized,
            processors,
            registry: FilterRegistry::new(),
            icons,
            dispatcher,
            presenter,
            identity,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Claim the service identity and apply the initial settings.
    ///
    /// Returns false (leaving the service Stopped) when the daemon is
    /// disabled by configuration or another instance already holds the
    /// identity; both are normal outcomes, not errors.
    pub async fn start(&mut self, initial: &SettingsSnapshot) -> Result<bool, EngineError> {
        if !initial.enabled {
            tracing::info!("Disabled via configuration, not starting");
            self.state = ServiceState::Stopped;
            return Ok(false);
        }

        self.state = ServiceState::Claiming;
        if !self.identity.try_claim().await? {
            tracing::info!("Daemon already running, exiting");
            self.state = ServiceState::Stopped;
            return Ok(false);
        }

        self.apply_filters(initial);
        self.notice("activated").await;
        self.state = ServiceState::Running;
        tracing::info!("Notification service running");
        Ok(true)
    }

    /// The routing loop. Returns once the service is disabled.
    pub async fn run(
        &mut self,
        mut messages: mpsc::Receiver<Message>,
        mut settings: mpsc::Receiver<SettingsSnapshot>,
        mut control: mpsc::Receiver<ControlEvent>,
    ) {
        while self.state == ServiceState::Running {
            tokio::select! {
                maybe_message = messages.recv() => match maybe_message {
                    Some(message) => self.handle_message(&message).await,
                    None => {
                        tracing::info!("Message stream ended");
                        self.disable().await;
                    }
                },
                Some(snapshot) = settings.recv() => self.apply_settings(&snapshot).await,
                Some(event) = control.recv() => match event {
                    ControlEvent::Enable => {
                        // Activation hook; already running.
                        tracing::debug!("Enable requested while running, no-op");
                    }
                    ControlEvent::Disable => self.disable().await,
                },
            }
        }
    }

    async fn handle_message(&mut self, message: &Message) {
        let processor = self.processors.processor_for(message);
        if router::route(message, processor.as_deref(), &self.registry).is_some() {
            self.dispatcher.dispatch(message, processor.as_deref()).await;
        }
    }

    async fn apply_settings(&mut self, snapshot: &SettingsSnapshot) {
        if !snapshot.enabled {
            tracing::info!("Disabled via settings change");
            self.disable().await;
            return;
        }
        self.apply_filters(snapshot);
    }

    fn apply_filters(&mut self, snapshot: &SettingsSnapshot) {
        self.registry
            .reload(&snapshot.enabled_filters, &snapshot.filter_settings);
        let services: HashSet<String> = snapshot.enabled_services.iter().cloned().collect();
        self.registry
            .reload_topic_filters(&services, &self.processors);
        self.dispatcher.set_emit_signals(snapshot.emit_signals);
    }

    /// Stop accepting messages, purge the cache, and release the
    /// service identity. In-flight icon fetches finish on their own.
    async fn disable(&mut self) {
        if self.state != ServiceState::Running {
            return;
        }
        self.state = ServiceState::Stopped;
        self.icons.purge_all().await;
        if let Err(e) = self.identity.release().await {
            tracing::warn!(error = %e, "Failed to release service identity");
        }
        self.notice("deactivated").await;
        tracing::info!("Exiting");
    }

    async fn notice(&self, text: &str) {
        if let Err(e) = self.presenter.show("fedmsg", text, None, None).await {
            tracing::warn!(error = %e, "Could not show service notice");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::capabilities::{IconFetcher, SignalEmitter};

    use super::*;

    #[derive(Default)]
    struct FakePresenter {
        shown: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationPresenter for FakePresenter {
        async fn show(
            &self,
            title: &str,
            body: &str,
            _icon: Option<&Path>,
            _secondary_icon: Option<&Path>,
        ) -> Result<(), EngineError> {
            self.shown
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct NullEmitter;

    #[async_trait]
    impl SignalEmitter for NullEmitter {
        async fn emit(&self, _topic: &str, _body: &str) -> Result<(), EngineError> {
            Ok(())
        }
    }

    struct NullFetcher;

    #[async_trait]
    impl IconFetcher for NullFetcher {
        async fn fetch(&self, _url: &str, dest: &Path) -> Result<(), EngineError> {
            tokio::fs::write(dest, b"icon").await?;
            Ok(())
        }
    }

    /// Identity whose claim outcome is scripted.
    struct FakeIdentity {
        available: AtomicBool,
        claims: AtomicUsize,
        released: AtomicBool,
    }

    impl FakeIdentity {
        fn free() -> Self {
            Self {
                available: AtomicBool::new(true),
                claims: AtomicUsize::new(0),
                released: AtomicBool::new(false),
            }
        }

        fn taken() -> Self {
            Self {
                available: AtomicBool::new(false),
                claims: AtomicUsize::new(0),
                released: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ServiceIdentity for FakeIdentity {
        async fn try_claim(&self) -> Result<bool, EngineError> {
            self.claims.fetch_add(1, Ordering::SeqCst);
            Ok(self.available.swap(false, Ordering::SeqCst))
        }

        async fn release(&self) -> Result<(), EngineError> {
            self.released.store(true, Ordering::SeqCst);
            self.available.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        presenter: Arc<FakePresenter>,
        identity: Arc<FakeIdentity>,
        service: NotifyService,
    }

    fn harness(identity: FakeIdentity) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let presenter = Arc::new(FakePresenter::default());
        let identity = Arc::new(identity);
        let icons = Arc::new(IconCache::new(
            dir.path().join("icons"),
            Arc::new(NullFetcher),
        ));
        let dispatcher = Dispatcher::new(
            Arc::clone(&icons),
            Arc::clone(&presenter) as Arc<dyn NotificationPresenter>,
            Arc::new(NullEmitter),
        );
        let service = NotifyService::new(
            Arc::new(ProcessorRegistry::with_defaults()),
            icons,
            dispatcher,
            Arc::clone(&presenter) as Arc<dyn NotificationPresenter>,
            Arc::clone(&identity) as Arc<dyn ServiceIdentity>,
        );
        Harness {
            _dir: dir,
            presenter,
            identity,
            service,
        }
    }

    fn enabled_snapshot() -> SettingsSnapshot {
        SettingsSnapshot {
            enabled: true,
            emit_signals: false,
            enabled_filters: vec!["package-list".to_string()],
            enabled_services: vec![],
            filter_settings: HashMap::from([("package-list".to_string(), "foo".to_string())]),
        }
    }

    fn bodhi_message(package: &str) -> Message {
        Message::new(
            "org.fedoraproject.prod.bodhi.update.request.testing",
            json!({
                "update": {
                    "title": format!("{package}-1.0-1.fc40"),
                    "builds": [{"nvr": format!("{package}-1.0-1.fc40")}],
                },
            }),
        )
    }

    #[tokio::test]
    async fn disabled_config_never_claims() {
        let mut h = harness(FakeIdentity::free());
        let snapshot = SettingsSnapshot::default();

        assert!(!h.service.start(&snapshot).await.unwrap());
        assert_eq!(h.service.state(), ServiceState::Stopped);
        assert_eq!(h.identity.claims.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_instance_stops_without_processing() {
        let mut h = harness(FakeIdentity::taken());

        assert!(!h.service.start(&enabled_snapshot()).await.unwrap());
        assert_eq!(h.service.state(), ServiceState::Stopped);
        // No activation notice was shown.
        assert!(h.presenter.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn routes_and_dispatches_matching_messages() {
        let mut h = harness(FakeIdentity::free());
        assert!(h.service.start(&enabled_snapshot()).await.unwrap());
        assert_eq!(h.service.state(), ServiceState::Running);

        let (msg_tx, msg_rx) = mpsc::channel(8);
        let (_set_tx, set_rx) = mpsc::channel(8);
        let (ctl_tx, ctl_rx) = mpsc::channel(8);

        let presenter = Arc::clone(&h.presenter);
        let mut service = h.service;
        let loop_handle = tokio::spawn(async move {
            service.run(msg_rx, set_rx, ctl_rx).await;
            service
        });

        msg_tx.send(bodhi_message("foo")).await.unwrap();
        msg_tx.send(bodhi_message("unrelated")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let shown = presenter.shown.lock().unwrap();
                if shown.iter().any(|(title, _)| title == "bodhi") {
                    break;
                }
                drop(shown);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("matching message dispatched");

        ctl_tx.send(ControlEvent::Disable).await.unwrap();
        let service = tokio::time::timeout(Duration::from_secs(2), loop_handle)
            .await
            .expect("loop exits")
            .unwrap();
        assert_eq!(service.state(), ServiceState::Stopped);
        assert!(h.identity.released.load(Ordering::SeqCst));

        // Only the "foo" update got through, plus the service notices.
        let shown = h.presenter.shown.lock().unwrap();
        let bodhi: Vec<_> = shown.iter().filter(|(title, _)| title == "bodhi").collect();
        assert_eq!(bodhi.len(), 1);
        assert!(shown.iter().any(|(_, body)| body == "activated"));
        assert!(shown.iter().any(|(_, body)| body == "deactivated"));
    }

    #[tokio::test]
    async fn enable_while_running_is_a_no_op() {
        let mut h = harness(FakeIdentity::free());
        assert!(h.service.start(&enabled_snapshot()).await.unwrap());

        let (msg_tx, msg_rx) = mpsc::channel(8);
        let (_set_tx, set_rx) = mpsc::channel(8);
        let (ctl_tx, ctl_rx) = mpsc::channel(8);

        let presenter = Arc::clone(&h.presenter);
        let mut service = h.service;
        let loop_handle = tokio::spawn(async move {
            service.run(msg_rx, set_rx, ctl_rx).await;
            service
        });

        ctl_tx.send(ControlEvent::Enable).await.unwrap();

        // The loop keeps routing after the redundant enable.
        msg_tx.send(bodhi_message("foo")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if presenter
                    .shown
                    .lock()
                    .unwrap()
                    .iter()
                    .any(|(title, _)| title == "bodhi")
                {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("still dispatching after redundant enable");

        ctl_tx.send(ControlEvent::Disable).await.unwrap();
        let service = tokio::time::timeout(Duration::from_secs(2), loop_handle)
            .await
            .expect("loop exits")
            .unwrap();
        assert_eq!(service.state(), ServiceState::Stopped);

        // One claim and one activation notice; the enable did not
        // restart the lifecycle.
        assert_eq!(h.identity.claims.load(Ordering::SeqCst), 1);
        let shown = h.presenter.shown.lock().unwrap();
        assert_eq!(
            shown.iter().filter(|(_, body)| body == "activated").count(),
            1
        );
    }

    #[tokio::test]
    async fn settings_change_disables_the_running_service() {
        let mut h = harness(FakeIdentity::free());
        assert!(h.service.start(&enabled_snapshot()).await.unwrap());

        let (_msg_tx, msg_rx) = mpsc::channel::<Message>(8);
        let (set_tx, set_rx) = mpsc::channel(8);
        let (_ctl_tx, ctl_rx) = mpsc::channel(8);

        let mut service = h.service;
        let loop_handle = tokio::spawn(async move {
            service.run(msg_rx, set_rx, ctl_rx).await;
            service
        });

        set_tx.send(SettingsSnapshot::default()).await.unwrap();
        let service = tokio::time::timeout(Duration::from_secs(2), loop_handle)
            .await
            .expect("loop exits")
            .unwrap();
        assert_eq!(service.state(), ServiceState::Stopped);
        assert!(h.identity.released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stream_end_disables_the_service() {
        let mut h = harness(FakeIdentity::free());
        assert!(h.service.start(&enabled_snapshot()).await.unwrap());

        let (msg_tx, msg_rx) = mpsc::channel::<Message>(8);
        let (_set_tx, set_rx) = mpsc::channel(8);
        let (_ctl_tx, ctl_rx) = mpsc::channel(8);
        drop(msg_tx);

        let mut service = h.service;
        let loop_handle = tokio::spawn(async move {
            service.run(msg_rx, set_rx, ctl_rx).await;
            service
        });
        let service = tokio::time::timeout(Duration::from_secs(2), loop_handle)
            .await
            .expect("loop exits")
            .unwrap();
        assert_eq!(service.state(), ServiceState::Stopped);
    }
}
