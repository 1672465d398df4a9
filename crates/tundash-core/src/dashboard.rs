// ── Dashboard facade ──
//
// Wires the configuration store, status poller, log consumer, editor
// and topology view into one handle. Background work (status polling,
// log reading, topology rendering, command processing) runs in tasks
// torn down by a shared cancellation token.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{Backend, HttpBackend};
use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::DashboardConfig;
use crate::editor::InstanceEditor;
use crate::error::CoreError;
use crate::logs::LogStreamConsumer;
use crate::model::FirewallRules;
use crate::poller::StatusPoller;
use crate::store::ConfigStore;
use crate::stream::Subscription;
use crate::topology::{self, AnimationChange, TopologyGraph, TopologyView};

const COMMAND_CHANNEL_SIZE: usize = 64;
const ANIMATION_CHANNEL_SIZE: usize = 256;

// ── DashboardState ───────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardState {
    Idle,
    Starting,
    Running,
    Closed,
}

// ── Dashboard ────────────────────────────────────────────────────────

/// The main entry point for surfaces.
///
/// Cheaply cloneable via `Arc<DashboardInner>`.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    backend: Arc<dyn Backend>,
    store: Arc<ConfigStore>,
    poller: StatusPoller,
    logs: LogStreamConsumer,
    editor: InstanceEditor,
    topology_view: TopologyView,
    topology: watch::Sender<Arc<TopologyGraph>>,
    animations: broadcast::Sender<AnimationChange>,
    state: watch::Sender<DashboardState>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    /// Create a dashboard talking HTTP to `config.url`. Does not touch
    /// the network; call [`start()`](Self::start).
    pub fn new(config: DashboardConfig) -> Result<Self, CoreError> {
        let backend = HttpBackend::new(&config)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Create a dashboard over any [`Backend`].
    pub fn with_backend(config: DashboardConfig, backend: Arc<dyn Backend>) -> Self {
        let store = Arc::new(ConfigStore::new(backend.clone()));
        let poller = StatusPoller::new(backend.clone());
        let logs = LogStreamConsumer::new(
            backend.clone(),
            config.log_capacity,
            config.autoscroll_threshold_px,
        );
        let editor = InstanceEditor::new(store.clone(), backend.clone(), config.restart_on_toggle);
        let (topology, _) = watch::channel(Arc::new(TopologyGraph::default()));
        let (animations, _) = broadcast::channel(ANIMATION_CHANNEL_SIZE);
        let (state, _) = watch::channel(DashboardState::Idle);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(DashboardInner {
                config,
                backend,
                store,
                poller,
                logs,
                editor,
                topology_view: TopologyView::new(),
                topology,
                animations,
                state,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load the configuration, then start polling, the log stream, the
    /// topology renderer and the command processor.
    ///
    /// Only the initial configuration load is fatal. A failed first
    /// status poll or log connect is logged and left to the components'
    /// own state.
    pub async fn start(&self) -> Result<(), CoreError> {
        match self.state() {
            DashboardState::Idle => {}
            DashboardState::Closed => return Err(CoreError::DashboardClosed),
            DashboardState::Starting | DashboardState::Running => return Ok(()),
        }
        self.inner.state.send_replace(DashboardState::Starting);

        if let Err(e) = self.inner.store.load().await {
            self.inner.state.send_replace(DashboardState::Idle);
            return Err(e);
        }

        let interval = self.inner.config.poll_interval;
        if !self.inner.poller.start(interval) {
            // No timer: take one snapshot so reads have something to show.
            self.inner.poller.poll_now().await;
        }

        if self.inner.config.stream_logs {
            if let Err(e) = self.inner.logs.connect().await {
                warn!(error = %e, "log stream unavailable at startup");
            }
        }

        self.render_topology();

        let mut handles = self.inner.task_handles.lock().await;
        handles.push(tokio::spawn(topology_task(
            self.clone(),
            self.inner.cancel.child_token(),
        )));
        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            handles.push(tokio::spawn(command_processor_task(
                self.clone(),
                rx,
                self.inner.cancel.child_token(),
            )));
        }
        drop(handles);

        self.inner.state.send_replace(DashboardState::Running);
        info!(url = %self.inner.config.url, "dashboard started");
        Ok(())
    }

    /// Stop the poll timer, close the log stream and the store, and join
    /// background tasks. Commits already in flight still reach the
    /// backend but publish nothing. Idempotent.
    pub async fn shutdown(&self) {
        if self.state() == DashboardState::Closed {
            return;
        }
        self.inner.state.send_replace(DashboardState::Closed);
        self.inner.store.close();
        self.inner.cancel.cancel();
        self.inner.poller.stop().await;
        self.inner.logs.disconnect().await;

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("dashboard shut down");
    }

    pub fn state(&self) -> DashboardState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DashboardState> {
        self.inner.state.subscribe()
    }

    // ── Components ───────────────────────────────────────────────────

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.inner.store
    }

    pub fn poller(&self) -> &StatusPoller {
        &self.inner.poller
    }

    pub fn logs(&self) -> &LogStreamConsumer {
        &self.inner.logs
    }

    pub fn editor(&self) -> &InstanceEditor {
        &self.inner.editor
    }

    // ── Topology ─────────────────────────────────────────────────────

    /// Subscribe to re-rendered topology graphs.
    pub fn topology(&self) -> Subscription<TopologyGraph> {
        Subscription::new(self.inner.topology.subscribe())
    }

    pub fn topology_snapshot(&self) -> Arc<TopologyGraph> {
        self.inner.topology.borrow().clone()
    }

    /// Per-instance animation start/stop notifications.
    pub fn animations(&self) -> broadcast::Receiver<AnimationChange> {
        self.inner.animations.subscribe()
    }

    fn render_topology(&self) {
        let config = self.inner.store.snapshot();
        let status = self.inner.poller.snapshot();
        let graph = Arc::new(topology::render(&config, &status));

        for change in self.inner.topology_view.update(graph.clone()) {
            let _ = self.inner.animations.send(change);
        }
        self.inner.topology.send_replace(graph);
    }

    // ── Ad-hoc queries ───────────────────────────────────────────────

    pub async fn firewall_rules(&self) -> Result<FirewallRules, CoreError> {
        self.inner.backend.firewall_rules().await
    }

    // ── Command execution ────────────────────────────────────────────

    /// Execute a command.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if self.state() != DashboardState::Running {
            return Err(CoreError::DashboardClosed);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::DashboardClosed)?;

        rx.await.map_err(|_| CoreError::DashboardClosed)?
    }

    // ── One-shot convenience ─────────────────────────────────────────

    /// Start, run the closure, shut down.
    ///
    /// Disables the background poller and the log stream since a single
    /// request-response cycle is all that is needed.
    pub async fn oneshot<F, Fut, T>(config: DashboardConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Dashboard) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let dashboard = Dashboard::new(config.oneshot())?;
        dashboard.start().await?;
        let result = f(dashboard.clone()).await;
        dashboard.shutdown().await;
        result
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Re-render the topology whenever the configuration or status changes.
async fn topology_task(dashboard: Dashboard, cancel: CancellationToken) {
    let mut config = dashboard.inner.store.subscribe();
    let mut status = dashboard.inner.poller.subscribe();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = config.changed() => {
                if changed.is_none() { break; }
            }
            changed = status.changed() => {
                if changed.is_none() { break; }
            }
        }
        dashboard.render_topology();
    }
}

async fn command_processor_task(
    dashboard: Dashboard,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&dashboard, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────────

async fn route_command(dashboard: &Dashboard, cmd: Command) -> Result<CommandResult, CoreError> {
    let inner = &dashboard.inner;
    debug!(?cmd, "routing command");

    match cmd {
        // ── Instance operations ──────────────────────────────────────
        Command::AddInstance { variant, draft } => {
            let id = inner.editor.add(variant, draft).await?;
            Ok(CommandResult::Added(id))
        }
        Command::UpdateInstance { id, patch } => {
            let config = inner.editor.update(&id, patch).await?;
            Ok(CommandResult::Configuration(config))
        }
        Command::RemoveInstance { id } => {
            let config = inner.editor.remove(&id).await?;
            Ok(CommandResult::Configuration(config))
        }
        Command::SetEnabled { id, enabled } => {
            let outcome = inner.editor.set_enabled(&id, enabled).await?;
            Ok(CommandResult::Edited(outcome))
        }
        Command::ToggleInstance { id } => {
            let outcome = inner.editor.toggle(&id).await?;
            Ok(CommandResult::Edited(outcome))
        }

        // ── Service operations ───────────────────────────────────────
        Command::SetGeneral(patch) => {
            let outcome = inner.editor.set_general(patch).await?;
            Ok(CommandResult::Edited(outcome))
        }
        Command::ResetConfiguration => {
            let config = inner.store.reset().await?;
            Ok(CommandResult::Configuration(config))
        }
        Command::Restart => {
            inner.editor.restart().await?;
            Ok(CommandResult::Ok)
        }
        Command::ReloadConfiguration => {
            let config = inner.store.load().await?;
            Ok(CommandResult::Configuration(config))
        }
        Command::PollStatus => Ok(CommandResult::Polled(inner.poller.poll_now().await)),

        // ── Log stream ───────────────────────────────────────────────
        Command::ConnectLogs => {
            inner.logs.connect().await?;
            Ok(CommandResult::Ok)
        }
        Command::DisconnectLogs => {
            inner.logs.disconnect().await;
            Ok(CommandResult::Ok)
        }
        Command::ClearLogs => {
            inner.logs.clear();
            Ok(CommandResult::Ok)
        }
    }
}
