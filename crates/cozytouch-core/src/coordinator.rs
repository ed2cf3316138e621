// ── Update coordinator ──
//
// Owns the single refresh cycle against the cloud. One background worker
// refreshes on a fixed interval or on request; every successful refresh
// builds a fresh `SetupTree`, swaps it in atomically and then notifies
// listeners. Readers only ever load the current `Arc`.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use cozytouch_api::RemoteClient;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::{CoreError, RefreshError};
use crate::stream::SnapshotStream;
use crate::tree::SetupTree;

type Listener = Arc<dyn Fn(&Arc<SetupTree>) + Send + Sync>;

// ── RefreshState ─────────────────────────────────────────────────────

/// Scheduling state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
    /// Last refresh failed. Not terminal: the next trigger retries, unless
    /// the failure was an authentication error.
    Failed,
}

/// Handle returned by [`Coordinator::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// ── Coordinator ──────────────────────────────────────────────────────

/// Shared owner of the remote session and the current snapshot.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`; adapters hold clones and
/// read [`data()`](Self::data) whenever they need state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    client: Arc<dyn RemoteClient>,
    config: CoordinatorConfig,
    data: ArcSwapOption<SetupTree>,
    last_error: ArcSwapOption<RefreshError>,
    state: watch::Sender<RefreshState>,
    snapshots: watch::Sender<Option<Arc<SetupTree>>>,
    /// Serializes refreshes so at most one fetch is outstanding.
    refresh_lock: Mutex<()>,
    /// Holds at most one pending manual request, which is what coalesces
    /// bursts of `request_refresh` into a single follow-up refresh.
    refresh_requested: Notify,
    listeners: std::sync::Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
    consecutive_throttles: AtomicU32,
    reauth_required: AtomicBool,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator. Nothing is fetched until
    /// [`first_refresh()`](Self::first_refresh) or [`start()`](Self::start).
    pub fn new(client: Arc<dyn RemoteClient>, config: CoordinatorConfig) -> Self {
        let (state, _) = watch::channel(RefreshState::Idle);
        let (snapshots, _) = watch::channel(None);

        Self {
            inner: Arc::new(CoordinatorInner {
                client,
                config,
                data: ArcSwapOption::empty(),
                last_error: ArcSwapOption::empty(),
                state,
                snapshots,
                refresh_lock: Mutex::new(()),
                refresh_requested: Notify::new(),
                listeners: std::sync::Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                consecutive_throttles: AtomicU32::new(0),
                reauth_required: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// The shared remote client, for device commands.
    pub fn client(&self) -> &dyn RemoteClient {
        self.inner.client.as_ref()
    }

    // ── Snapshot access ──────────────────────────────────────────────

    /// The current complete snapshot, or `None` before the first success.
    pub fn data(&self) -> Option<Arc<SetupTree>> {
        self.inner.data.load_full()
    }

    /// The failure of the most recent refresh, cleared by the next success.
    pub fn last_error(&self) -> Option<RefreshError> {
        self.inner.last_error.load_full().map(|e| (*e).clone())
    }

    pub fn state(&self) -> RefreshState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<RefreshState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshots.subscribe())
    }

    /// `true` once a refresh failed authentication. Automatic refreshes
    /// stay stopped until a new coordinator is set up with valid credentials.
    pub fn requires_reauth(&self) -> bool {
        self.inner.reauth_required.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Register a callback invoked once per successful refresh, after the
    /// new snapshot is installed.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Arc<SetupTree>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    fn notify_listeners(&self, tree: &Arc<SetupTree>) {
        // Clone out so a listener may (de)register without deadlocking.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(tree);
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Run the initial refresh that setup depends on.
    ///
    /// An authentication failure maps to [`CoreError::AuthFailure`]; any
    /// other failure to [`CoreError::UpdateFailed`].
    pub async fn first_refresh(&self) -> Result<Arc<SetupTree>, CoreError> {
        if self.is_shut_down() {
            return Err(CoreError::Stopped);
        }
        Ok(self.refresh().await?)
    }

    /// Spawn the background refresh worker. Calling it twice is a no-op.
    pub async fn start(&self) {
        let mut worker = self.inner.worker.lock().await;
        if worker.is_some() || self.is_shut_down() {
            return;
        }
        let cancel = self.inner.cancel.child_token();
        *worker = Some(tokio::spawn(refresh_task(self.clone(), cancel)));
        debug!(
            poll_interval_secs = self.inner.config.poll_interval.as_secs(),
            "refresh worker started"
        );
    }

    /// Ask for a refresh as soon as possible.
    ///
    /// Requests made while a refresh is running collapse into exactly one
    /// follow-up refresh. Has no effect before [`start()`](Self::start) is
    /// called beyond arming that single follow-up.
    pub fn request_refresh(&self) {
        self.inner.refresh_requested.notify_one();
    }

    /// Stop the worker. A refresh already in flight runs to completion but
    /// its result is dropped.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handle = self.inner.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "refresh worker terminated abnormally");
            }
        }
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!("coordinator shut down");
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Refresh now, after any in-flight refresh has finished.
    ///
    /// On success the new tree is installed and returned. After
    /// [`shutdown()`](Self::shutdown) the result is returned but never
    /// installed.
    pub async fn refresh(&self) -> Result<Arc<SetupTree>, RefreshError> {
        let _guard = self.inner.refresh_lock.lock().await;
        self.inner.state.send_replace(RefreshState::Refreshing);
        let started = Instant::now();

        let bound = self.inner.config.refresh_timeout;
        let outcome = match tokio::time::timeout(bound, self.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(RefreshError::Network {
                message: format!("refresh timed out after {}s", bound.as_secs()),
            }),
        };

        if self.is_shut_down() {
            debug!("coordinator shut down during refresh, discarding result");
            self.inner.state.send_replace(RefreshState::Idle);
            return outcome.map(Arc::new);
        }

        match outcome {
            Ok(tree) => Ok(self.publish(tree, started.elapsed())),
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<SetupTree, RefreshError> {
        let client = self.client();
        client.connect().await?;
        let raw = client.fetch_setup().await?;
        Ok(SetupTree::build(raw))
    }

    fn publish(&self, tree: SetupTree, elapsed: Duration) -> Arc<SetupTree> {
        let tree = Arc::new(tree);
        self.inner.data.store(Some(Arc::clone(&tree)));
        self.inner.last_error.store(None);
        self.inner.consecutive_throttles.store(0, Ordering::Relaxed);
        self.inner.state.send_replace(RefreshState::Idle);
        self.inner.snapshots.send_replace(Some(Arc::clone(&tree)));

        debug!(
            devices = tree.len(),
            skipped = tree.diagnostics().len(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "snapshot published"
        );

        self.notify_listeners(&tree);
        tree
    }

    fn record_failure(&self, err: &RefreshError) {
        self.inner.last_error.store(Some(Arc::new(err.clone())));
        self.inner.state.send_replace(RefreshState::Failed);

        match err {
            RefreshError::Auth { .. } => {
                self.inner.reauth_required.store(true, Ordering::Release);
                warn!(error = %err, "refresh rejected, re-authentication required");
            }
            RefreshError::Throttled { .. } => {
                self.inner
                    .consecutive_throttles
                    .fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "refresh throttled, keeping previous snapshot");
            }
            RefreshError::Network { .. } => {
                warn!(error = %err, "refresh failed, keeping previous snapshot");
            }
        }
    }

    /// Delay before the next automatic refresh.
    fn next_delay(&self, last: Option<&RefreshError>) -> Duration {
        let poll = self.inner.config.poll_interval;
        let (Some(cap), Some(RefreshError::Throttled { retry_after_secs, .. })) =
            (self.inner.config.max_backoff, last)
        else {
            return poll;
        };

        let streak = self.inner.consecutive_throttles.load(Ordering::Relaxed);
        let factor = 2u32.saturating_pow(streak.saturating_sub(1));
        let backoff = poll.saturating_mul(factor);
        let hinted = retry_after_secs.map_or(Duration::ZERO, Duration::from_secs);
        backoff.max(hinted).min(cap.max(poll))
    }
}

// ── Background task ──────────────────────────────────────────────────

/// Refresh on every poll interval or manual request until cancelled.
/// The interval restarts after each refresh, whatever triggered it.
async fn refresh_task(coordinator: Coordinator, cancel: CancellationToken) {
    let mut delay = coordinator.inner.config.poll_interval;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = coordinator.inner.refresh_requested.notified() => {
                debug!("manual refresh requested");
            }
            () = tokio::time::sleep(delay) => {}
        }

        match coordinator.refresh().await {
            Ok(_) => delay = coordinator.next_delay(None),
            Err(RefreshError::Auth { .. }) => {
                warn!("automatic refresh halted until re-authentication");
                break;
            }
            Err(e) => delay = coordinator.next_delay(Some(&e)),
        }
    }

    debug!("refresh worker stopped");
}
