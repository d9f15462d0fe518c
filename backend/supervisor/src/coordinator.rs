//! Config-driven restarts of the live runtime.
//!
//! A change signal runs one restart cycle: wait out the debounce, stop the
//! current transport, reload the file, then build and connect a new runtime.
//! Only one cycle runs at a time. A signal that arrives while a cycle is in
//! flight is dropped, so a burst of file events yields a single restart.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

use chatbridge_config::{BridgeConfig, ConfigStore, ConfigWatcher};
use chatbridge_core::ChatTransport;

use crate::error::RestartError;
use crate::factory::ServiceFactory;
use crate::runtime::RuntimeState;

/// Delay between a change signal and the reload, letting the writer finish.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    Restarted,
    /// Another cycle was already running, or the coordinator is shut down.
    Skipped,
    /// The cycle ran but left no transport connected.
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestartStats {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct RestartState {
    in_progress: bool,
    /// The running cycle is the initial `start`.
    starting: bool,
    /// A change signal arrived during the initial `start`.
    changed_during_start: bool,
}

/// Clears the in-progress flag when a cycle ends, however it ends.
struct InProgressGuard<'a> {
    state: &'a Mutex<RestartState>,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_progress = false;
        state.starting = false;
    }
}

pub struct RestartCoordinator {
    store: Arc<ConfigStore>,
    factory: Arc<dyn ServiceFactory>,
    debounce: Duration,
    state: Mutex<RestartState>,
    runtime: tokio::sync::Mutex<Option<RuntimeState>>,
    closed: AtomicBool,
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl RestartCoordinator {
    pub fn new(store: Arc<ConfigStore>, factory: Arc<dyn ServiceFactory>) -> Self {
        Self {
            store,
            factory,
            debounce: DEFAULT_DEBOUNCE,
            state: Mutex::new(RestartState::default()),
            runtime: tokio::sync::Mutex::new(None),
            closed: AtomicBool::new(false),
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Load the config and bring up the first runtime, without debounce.
    ///
    /// A change signal that arrives meanwhile is not dropped: one restart
    /// cycle runs before this returns, so the newest file is applied.
    pub async fn start(&self) -> Result<(), RestartError> {
        let result = {
            let Some(_guard) = self.try_begin(true) else {
                self.skipped.fetch_add(1, Ordering::SeqCst);
                info!("Restart in progress; initial start skipped");
                return Ok(());
            };
            self.bring_up().await
        };

        let changed = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut state.changed_during_start)
        };
        if changed {
            info!("Configuration changed during start; restarting");
            self.restart().await;
        }
        result
    }

    /// Run a restart cycle in the background. Used as the watcher callback.
    pub fn on_config_changed(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.restart().await;
        });
    }

    /// Watch the config file and restart on every change.
    pub fn watch_config(self: &Arc<Self>) -> Result<ConfigWatcher, notify::Error> {
        let this = Arc::clone(self);
        self.store.watch(move || this.on_config_changed())
    }

    /// Run one restart cycle unless one is already running.
    ///
    /// Errors are logged here; the caller only learns the outcome.
    pub async fn restart(&self) -> RestartOutcome {
        if self.is_closed() {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            info!("Coordinator shut down; change signal dropped");
            return RestartOutcome::Skipped;
        }
        let Some(_guard) = self.try_begin(false) else {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            info!("Restart already in progress; change signal dropped");
            return RestartOutcome::Skipped;
        };
        self.started.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.debounce).await;
        info!("Configuration has been changed.");
        self.stop_runtime().await;

        match self.bring_up().await {
            Ok(()) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
                info!("Restart complete");
                RestartOutcome::Restarted
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                error!(
                    "Restart failed, bot stays offline until the next config change: {}",
                    e
                );
                RestartOutcome::Failed
            }
        }
    }

    /// Stop the live runtime, if any. No runtime is brought up afterwards,
    /// including by a restart cycle already in flight.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.stop_runtime().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Snapshot the running generation is using, if one is up.
    pub async fn active_config(&self) -> Option<Arc<BridgeConfig>> {
        self.runtime
            .lock()
            .await
            .as_ref()
            .map(|rt| Arc::clone(rt.config()))
    }

    /// Transport of the running generation, if one is up.
    pub async fn active_transport(&self) -> Option<Arc<dyn ChatTransport>> {
        self.runtime
            .lock()
            .await
            .as_ref()
            .map(|rt| Arc::clone(rt.transport()))
    }

    pub async fn is_running(&self) -> bool {
        self.runtime.lock().await.is_some()
    }

    pub fn is_restarting(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_progress
    }

    pub fn stats(&self) -> RestartStats {
        RestartStats {
            started: self.started.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }

    fn try_begin(&self, initial: bool) -> Option<InProgressGuard<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_progress {
            if state.starting && !initial {
                state.changed_during_start = true;
            }
            return None;
        }
        state.in_progress = true;
        state.starting = initial;
        Some(InProgressGuard { state: &self.state })
    }

    async fn bring_up(&self) -> Result<(), RestartError> {
        if self.is_closed() {
            return Err(RestartError::Closed);
        }
        let config = self.store.load().await?;
        let runtime = RuntimeState::start(config, self.factory.as_ref()).await?;

        // `shutdown` sets the flag before taking this lock, so checking under
        // the lock cannot miss it.
        let mut slot = self.runtime.lock().await;
        if self.is_closed() {
            drop(slot);
            if let Err(e) = runtime.stop().await {
                warn!("Stopping runtime started during shutdown failed: {}", e);
            }
            return Err(RestartError::Closed);
        }
        let previous = slot.replace(runtime);
        drop(slot);
        if let Some(previous) = previous {
            // Only reachable if start() is called twice.
            if let Err(e) = previous.stop().await {
                warn!("Stopping replaced runtime failed: {}", e);
            }
        }
        Ok(())
    }

    async fn stop_runtime(&self) {
        let current = self.runtime.lock().await.take();
        if let Some(runtime) = current {
            if let Err(e) = runtime.stop().await {
                warn!("Transport did not stop cleanly: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbridge_channels::MemoryTransport;
    use chatbridge_completion::providers::mock::MockCompletionService;
    use chatbridge_core::{Author, BotIdentity, ChannelRef, CompletionService, InboundMessage};
    use std::path::{Path, PathBuf};

    const FAST: Duration = Duration::from_millis(50);

    fn config_json(token: &str) -> String {
        format!(
            r#"{{
                "DiscordToken": "{token}",
                "DiscordPrefix": "!",
                "ChatGptApiKey": "sk-test",
                "Directives": [
                    {{ "Command": "tlap", "Text": "Speak like a pirate." }},
                    {{ "Command": "zapp", "Text": "Speak like Zapp Brannigan." }}
                ]
            }}"#
        )
    }

    fn bot() -> BotIdentity {
        BotIdentity {
            user_id: "999".into(),
            name: "bridge".into(),
        }
    }

    #[derive(Default)]
    struct TestServices {
        transports: Mutex<Vec<Arc<MemoryTransport>>>,
        completion: Arc<MockCompletionService>,
        fail_connect: std::sync::atomic::AtomicBool,
        connect_delay: Mutex<Option<Duration>>,
    }

    impl TestServices {
        fn with_reply(reply: &str) -> Self {
            Self {
                completion: Arc::new(MockCompletionService::new().with_reply(reply)),
                ..Self::default()
            }
        }

        fn built(&self) -> Vec<Arc<MemoryTransport>> {
            self.transports.lock().unwrap().clone()
        }

        fn latest(&self) -> Arc<MemoryTransport> {
            self.built().last().cloned().expect("no transport built")
        }
    }

    impl ServiceFactory for TestServices {
        fn transport(&self, _config: &BridgeConfig) -> Arc<dyn ChatTransport> {
            let mut transport = MemoryTransport::new(bot());
            if self.fail_connect.load(Ordering::SeqCst) {
                transport = transport.with_failing_connect();
            }
            if let Some(delay) = *self.connect_delay.lock().unwrap() {
                transport = transport.with_connect_delay(delay);
            }
            let transport = Arc::new(transport);
            self.transports.lock().unwrap().push(Arc::clone(&transport));
            transport
        }

        fn completion(&self, _config: &BridgeConfig) -> Arc<dyn CompletionService> {
            Arc::clone(&self.completion) as Arc<dyn CompletionService>
        }
    }

    fn setup(
        dir: &Path,
        services: Arc<TestServices>,
    ) -> (PathBuf, Arc<RestartCoordinator>) {
        let path = dir.join("config.json");
        std::fs::write(&path, config_json("token-one")).unwrap();
        let store = Arc::new(ConfigStore::new(&path));
        let coordinator =
            Arc::new(RestartCoordinator::new(store, services).with_debounce(FAST));
        (path, coordinator)
    }

    fn guild_message(content: &str) -> InboundMessage {
        InboundMessage {
            id: "m1".into(),
            content: content.into(),
            author: Author::user("42", "alice"),
            channel: ChannelRef::guild("c1", "Crew"),
        }
    }

    async fn wait_until<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn start_connects_and_dispatches_translation() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::with_reply("  Ahoy there, matey!  "));
        let (_path, coordinator) = setup(dir.path(), Arc::clone(&services));

        coordinator.start().await.unwrap();
        assert!(coordinator.is_running().await);

        let transport = services.latest();
        assert_eq!(transport.credential().as_deref(), Some("token-one"));

        transport
            .inject(guild_message("!tlap hello there"))
            .await
            .unwrap();
        wait_until(|| !transport.sent().is_empty()).await;

        let requests = services.completion.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_prompt, "Speak like a pirate.");
        assert_eq!(requests[0].user_text, "hello there");

        let sent = transport.sent();
        assert_eq!(sent[0].0.id, "c1");
        assert_eq!(sent[0].1, "Ahoy there, matey!");

        coordinator.shutdown().await;
        assert!(!coordinator.is_running().await);
        assert_eq!(transport.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn burst_of_signals_restarts_once() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::default());
        let (_path, coordinator) = setup(dir.path(), Arc::clone(&services));
        coordinator.start().await.unwrap();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let c = Arc::clone(&coordinator);
                tokio::spawn(async move { c.restart().await })
            })
            .collect();
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        let restarted = outcomes
            .iter()
            .filter(|o| **o == RestartOutcome::Restarted)
            .count();
        assert_eq!(restarted, 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == RestartOutcome::Skipped)
                .count(),
            4
        );
        assert_eq!(
            coordinator.stats(),
            RestartStats {
                started: 1,
                completed: 1,
                failed: 0,
                skipped: 4,
            }
        );
        // initial start plus one restart
        assert_eq!(services.built().len(), 2);
        assert!(!coordinator.is_restarting());
    }

    #[tokio::test]
    async fn sequential_signals_each_restart() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::default());
        let (_path, coordinator) = setup(dir.path(), Arc::clone(&services));
        coordinator.start().await.unwrap();

        assert_eq!(coordinator.restart().await, RestartOutcome::Restarted);
        assert_eq!(coordinator.restart().await, RestartOutcome::Restarted);

        let built = services.built();
        assert_eq!(built.len(), 3);
        assert!(!built[0].is_connected());
        assert!(!built[1].is_connected());
        assert!(built[2].is_connected());
    }

    #[tokio::test]
    async fn restart_disconnects_old_transport_before_connecting_new() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::default());
        let (path, coordinator) = setup(dir.path(), Arc::clone(&services));
        coordinator.start().await.unwrap();
        let old = services.latest();

        std::fs::write(&path, config_json("token-two")).unwrap();
        assert_eq!(coordinator.restart().await, RestartOutcome::Restarted);

        assert_eq!(old.disconnect_count(), 1);
        assert!(old.inject(guild_message("!tlap hi")).await.is_err());

        let new = services.latest();
        assert_eq!(new.credential().as_deref(), Some("token-two"));
        let active = coordinator.active_config().await.unwrap();
        assert_eq!(active.credential, "token-two");
    }

    #[tokio::test]
    async fn malformed_config_leaves_bot_offline_until_next_valid_write() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::default());
        let (path, coordinator) = setup(dir.path(), Arc::clone(&services));
        coordinator.start().await.unwrap();
        let old = services.latest();

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(coordinator.restart().await, RestartOutcome::Failed);
        assert!(!coordinator.is_running().await);
        assert!(!old.is_connected());
        assert_eq!(services.built().len(), 1);
        assert!(!coordinator.is_restarting());

        std::fs::write(&path, config_json("token-three")).unwrap();
        assert_eq!(coordinator.restart().await, RestartOutcome::Restarted);
        assert!(coordinator.is_running().await);
        assert_eq!(
            services.latest().credential().as_deref(),
            Some("token-three")
        );
        assert_eq!(coordinator.stats().failed, 1);
    }

    #[tokio::test]
    async fn connect_failure_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::default());
        let (_path, coordinator) = setup(dir.path(), Arc::clone(&services));
        coordinator.start().await.unwrap();

        services.fail_connect.store(true, Ordering::SeqCst);
        assert_eq!(coordinator.restart().await, RestartOutcome::Failed);
        assert!(!coordinator.is_running().await);
        assert!(coordinator.active_transport().await.is_none());

        services.fail_connect.store(false, Ordering::SeqCst);
        assert_eq!(coordinator.restart().await, RestartOutcome::Restarted);
        assert!(coordinator.active_transport().await.is_some());
    }

    #[tokio::test]
    async fn edit_during_initial_start_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::default());
        *services.connect_delay.lock().unwrap() = Some(Duration::from_millis(200));
        let (path, coordinator) = setup(dir.path(), Arc::clone(&services));

        let starting = {
            let c = Arc::clone(&coordinator);
            tokio::spawn(async move { c.start().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(&path, config_json("token-two")).unwrap();
        assert_eq!(coordinator.restart().await, RestartOutcome::Skipped);

        starting.await.unwrap().unwrap();
        let active = coordinator.active_config().await.unwrap();
        assert_eq!(active.credential, "token-two");
        assert_eq!(services.built().len(), 2);
        assert_eq!(coordinator.stats().completed, 1);
        assert!(!coordinator.is_restarting());
    }

    #[tokio::test]
    async fn burst_during_restart_is_not_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::default());
        let (_path, coordinator) = setup(dir.path(), Arc::clone(&services));
        coordinator.start().await.unwrap();

        let first = {
            let c = Arc::clone(&coordinator);
            tokio::spawn(async move { c.restart().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(coordinator.restart().await, RestartOutcome::Skipped);
        assert_eq!(first.await.unwrap(), RestartOutcome::Restarted);

        tokio::time::sleep(FAST * 3).await;
        assert_eq!(services.built().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_during_restart_keeps_bot_offline() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::default());
        let path = dir.path().join("config.json");
        std::fs::write(&path, config_json("token-one")).unwrap();
        let store = Arc::new(ConfigStore::new(&path));
        let coordinator = Arc::new(
            RestartCoordinator::new(store, services.clone())
                .with_debounce(Duration::from_millis(200)),
        );
        coordinator.start().await.unwrap();

        let in_flight = {
            let c = Arc::clone(&coordinator);
            tokio::spawn(async move { c.restart().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        coordinator.shutdown().await;

        assert_eq!(in_flight.await.unwrap(), RestartOutcome::Failed);
        assert!(!coordinator.is_running().await);
        assert_eq!(services.built().len(), 1);
        assert!(services.built().iter().all(|t| !t.is_connected()));
        assert!(!coordinator.is_restarting());

        assert_eq!(coordinator.restart().await, RestartOutcome::Skipped);
        assert_eq!(services.built().len(), 1);
    }

    #[tokio::test]
    async fn start_without_config_file_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConfigStore::new(dir.path().join("config.json")));
        let coordinator = RestartCoordinator::new(store, Arc::new(TestServices::default()));

        let err = coordinator.start().await.unwrap_err();
        assert!(matches!(err, RestartError::Config(_)));
        assert!(!coordinator.is_running().await);
        assert!(!coordinator.is_restarting());
    }

    #[tokio::test]
    async fn file_write_triggers_restart_through_watcher() {
        let dir = tempfile::tempdir().unwrap();
        let services = Arc::new(TestServices::default());
        let (path, coordinator) = setup(dir.path(), Arc::clone(&services));
        coordinator.start().await.unwrap();
        let _watcher = coordinator.watch_config().unwrap();

        std::fs::write(&path, config_json("token-watched")).unwrap();
        let mut reloaded = false;
        for _ in 0..300 {
            let active = coordinator.active_config().await;
            if active.is_some_and(|c| c.credential == "token-watched") {
                reloaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(reloaded);
        assert!(coordinator.stats().completed >= 1);
    }
}
