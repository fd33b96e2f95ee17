// ── Refresh coordinator ──
//
// Owns the periodic refresh cycle and the current snapshot. One cycle runs
// at a time: the periodic task skips a tick that finds a cycle running, and
// manual requests coalesce with the cycle they waited on.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use shelfwatch_api::{ApiClient, Endpoint, Error, LibrariesResponse, Library};

use crate::accessor::{SessionWindow, UserFilter};
use crate::config::ServerConfig;
use crate::descriptor::{DecodeContext, Descriptor, DescriptorSet, Source};
use crate::error::CoreError;
use crate::snapshot::{FieldData, FieldValue, Snapshot};

/// Handle returned by [`Coordinator::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Responses already fetched during the current cycle, failures included.
type ResponseCache = HashMap<Endpoint, Result<Value, Error>>;

/// Polls one server and publishes a [`Snapshot`] per completed cycle.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: ServerConfig,
    client: ApiClient,
    descriptors: ArcSwap<DescriptorSet>,
    snapshot: ArcSwap<Snapshot>,
    updates: watch::Sender<Arc<Snapshot>>,
    last_success: AtomicBool,
    /// Set once any cycle produced at least one good field.
    has_data: AtomicBool,
    /// Completed cycles, used to coalesce manual refresh requests.
    cycles: AtomicU64,
    /// Held for the whole duration of a cycle.
    gate: Mutex<()>,
    listeners: DashMap<ListenerId, Listener>,
    next_listener: AtomicU64,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("url", &self.inner.config.url.as_str())
            .field("fields", &self.inner.descriptors.load().len())
            .field("cycles", &self.inner.cycles.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Build a coordinator with its own HTTP client. Does not fetch anything;
    /// call [`setup()`](Self::setup) for that.
    pub fn new(config: ServerConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let client = ApiClient::new(config.url.clone(), config.token.clone(), &config.transport())?;
        Ok(Self::assemble(config, client))
    }

    /// Build a coordinator around a caller-provided client (for instance one
    /// sharing a host-wide `reqwest::Client`).
    pub fn with_client(config: ServerConfig, client: ApiClient) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::assemble(config, client))
    }

    fn assemble(config: ServerConfig, client: ApiClient) -> Self {
        let empty = Arc::new(Snapshot::default());
        let (updates, _) = watch::channel(Arc::clone(&empty));
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                client,
                descriptors: ArcSwap::from_pointee(DescriptorSet::new()),
                snapshot: ArcSwap::new(empty),
                updates,
                last_success: AtomicBool::new(false),
                has_data: AtomicBool::new(false),
                cycles: AtomicU64::new(0),
                gate: Mutex::new(()),
                listeners: DashMap::new(),
                next_listener: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Fetch the library list, run the first cycle, then start polling.
    ///
    /// A library list that cannot be fetched for a modeled reason only
    /// costs the per-library fields; a first cycle without a single good
    /// field fails setup with [`CoreError::NotReady`].
    pub async fn setup(&self) -> Result<(), CoreError> {
        match self.load_libraries().await {
            Ok(libraries) => info!(count = libraries.len(), "library list loaded"),
            Err(CoreError::Api(e)) if !e.is_fatal() => {
                warn!(error = %e, "library list unavailable, per-library fields skipped");
            }
            Err(e) => return Err(e),
        }
        self.first_refresh().await?;
        self.start().await
    }

    /// Run the initial cycle. Same as [`refresh()`](Self::refresh); named
    /// separately because its `NotReady` result is the setup signal.
    pub async fn first_refresh(&self) -> Result<(), CoreError> {
        self.refresh().await
    }

    /// Spawn the periodic refresh task. Calling it twice is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Shutdown);
        }
        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return Ok(());
        }
        let interval = self.inner.config.scan_interval;
        *task = Some(tokio::spawn(refresh_task(
            self.clone(),
            interval,
            self.inner.cancel.clone(),
        )));
        debug!(interval_secs = interval.as_secs(), "periodic refresh started");
        Ok(())
    }

    /// Stop polling. An in-flight cycle is abandoned and never published.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        debug!("coordinator shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run one cycle now, waiting for any running cycle to finish first.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let cancel = self.inner.cancel.clone();
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::Shutdown),
            result = async {
                let _gate = self.inner.gate.lock().await;
                self.run_cycle().await
            } => result,
        }
    }

    /// Out-of-schedule refresh, coalesced with a running cycle: if a cycle
    /// completes while this call waits, no further cycle is started.
    pub async fn request_refresh(&self) -> Result<(), CoreError> {
        let seen = self.inner.cycles.load(Ordering::Acquire);
        let cancel = self.inner.cancel.clone();
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::Shutdown),
            result = async {
                let _gate = self.inner.gate.lock().await;
                if self.inner.cycles.load(Ordering::Acquire) != seen {
                    debug!("refresh request coalesced with completed cycle");
                    return Ok(());
                }
                self.run_cycle().await
            } => result,
        }
    }

    /// Periodic entry point: skip the tick if a cycle is already running.
    async fn tick(&self) {
        let Ok(_gate) = self.inner.gate.try_lock() else {
            debug!("refresh still running, tick skipped");
            return;
        };
        match self.run_cycle().await {
            Ok(()) => {}
            Err(e @ CoreError::NotReady { .. }) => {
                warn!(error = %e, "periodic refresh produced no data");
            }
            Err(e) => error!(error = %e, "periodic refresh failed"),
        }
    }

    /// Attempt every field once, then publish. Caller holds the gate.
    async fn run_cycle(&self) -> Result<(), CoreError> {
        let descriptors = self.inner.descriptors.load_full();
        let previous = self.inner.snapshot.load_full();
        let config = &self.inner.config;

        let ctx = DecodeContext {
            users: UserFilter {
                service_account: &config.service_account,
                own_token: config.exclude_own_token.then_some(&config.token),
            },
            libraries: descriptors.libraries(),
            sessions: config.session_idle.map_or(SessionWindow::All, |idle| {
                SessionWindow::Recent {
                    idle_ms: i64::try_from(idle.as_millis()).unwrap_or(i64::MAX),
                }
            }),
            now_ms: Utc::now().timestamp_millis(),
        };

        let mut cache = ResponseCache::new();
        let mut fields = IndexMap::with_capacity(descriptors.len());
        let mut all_transient = true;

        for descriptor in descriptors.iter() {
            let value = match self.evaluate(descriptor, &ctx, &mut cache).await {
                Ok(data) => FieldValue::ok(data),
                Err(e) if e.is_fatal() => {
                    self.inner.last_success.store(false, Ordering::Release);
                    error!(field = %descriptor.field, error = %e, "unexpected failure, cycle aborted");
                    return Err(CoreError::Unexpected {
                        field: descriptor.field.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    all_transient &= e.is_transient();
                    debug!(field = %descriptor.field, kind = %e.kind(), "field failed");
                    FieldValue::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                        last_known: previous
                            .get(&descriptor.field)
                            .and_then(FieldValue::latest)
                            .cloned(),
                    }
                }
            };
            fields.insert(descriptor.field.clone(), value);
        }

        let snapshot = Snapshot {
            taken_at: Utc::now(),
            fields,
        };
        let ok = snapshot.ok_count();
        let total = snapshot.fields.len();
        let had_data = self.inner.has_data.load(Ordering::Acquire);

        self.publish(snapshot, all_transient && ok > 0);

        if ok == 0 && !had_data {
            return Err(CoreError::NotReady {
                reason: format!("none of {total} fields could be fetched"),
            });
        }
        if ok > 0 {
            self.inner.has_data.store(true, Ordering::Release);
        }
        if ok < total {
            info!(ok, failed = total - ok, "refresh completed with failures");
        } else {
            debug!(fields = total, "refresh completed");
        }
        Ok(())
    }

    async fn evaluate(
        &self,
        descriptor: &Descriptor,
        ctx: &DecodeContext<'_>,
        cache: &mut ResponseCache,
    ) -> Result<FieldData, Error> {
        match &descriptor.source {
            Source::Endpoint(endpoint) => {
                let body = self.fetch_cached(endpoint, cache).await?;
                descriptor
                    .decoder
                    .decode(&body, ctx)
                    .map_err(|e| self.shape_error(&descriptor.field, endpoint, &e))
            }
            Source::EachLibrary => {
                // Walk the list as the server reports it this cycle.
                let listing = self.fetch_cached(&Endpoint::Libraries, cache).await?;
                let libraries = LibrariesResponse::deserialize(&listing)
                    .map_err(|e| self.shape_error(&descriptor.field, &Endpoint::Libraries, &e))?
                    .libraries;

                let mut bodies = serde_json::Map::with_capacity(libraries.len());
                for library in &libraries {
                    let endpoint = Endpoint::LibraryStats(library.id.clone());
                    bodies.insert(library.id.clone(), self.fetch_cached(&endpoint, cache).await?);
                }

                let ctx = DecodeContext {
                    libraries: &libraries,
                    ..*ctx
                };
                descriptor
                    .decoder
                    .decode(&Value::Object(bodies), &ctx)
                    .map_err(|e| self.shape_error(&descriptor.field, &Endpoint::Libraries, &e))
            }
        }
    }

    fn shape_error(&self, field: &str, endpoint: &Endpoint, err: &serde_json::Error) -> Error {
        let path = endpoint.path();
        let url = self
            .inner
            .client
            .url(&path)
            .map_or_else(|_| path.clone(), |u| u.to_string());
        error!(field, url = %url, error = %err, "unexpected response shape");
        Error::Parse {
            url,
            message: err.to_string(),
        }
    }

    async fn fetch_cached(&self, endpoint: &Endpoint, cache: &mut ResponseCache) -> Result<Value, Error> {
        if let Some(hit) = cache.get(endpoint) {
            return hit.clone();
        }
        let result = self.inner.client.fetch(endpoint).await;
        cache.insert(endpoint.clone(), result.clone());
        result
    }

    fn publish(&self, snapshot: Snapshot, success: bool) {
        let snapshot = Arc::new(snapshot);
        self.inner.snapshot.store(Arc::clone(&snapshot));
        self.inner.last_success.store(success, Ordering::Release);
        self.inner.cycles.fetch_add(1, Ordering::AcqRel);
        self.inner.updates.send_replace(snapshot);

        // Collected first so a listener may add or remove listeners.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    // ── Readers ──────────────────────────────────────────────────

    /// The most recent completed snapshot (empty before the first cycle).
    pub fn get_snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.load_full()
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.last_success.load(Ordering::Acquire)
    }

    /// Whether `field` succeeded in the last cycle; `None` for unknown fields.
    pub fn field_success(&self, field: &str) -> Option<bool> {
        self.inner.snapshot.load().get(field).map(FieldValue::is_ok)
    }

    /// Every field key the next cycle will produce, in order.
    pub fn field_keys(&self) -> Vec<String> {
        self.inner.descriptors.load().field_keys()
    }

    /// Libraries currently expanded into per-library fields.
    pub fn known_libraries(&self) -> Vec<Library> {
        self.inner.descriptors.load().libraries().to_vec()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.updates.subscribe()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.inner.cycles.load(Ordering::Acquire)
    }

    // ── Listeners ────────────────────────────────────────────────

    /// Register a callback invoked once per completed cycle. Listeners
    /// receive no payload; they read [`get_snapshot()`](Self::get_snapshot).
    pub fn add_listener<F>(&self, callback: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.insert(id, Arc::new(callback));
        id
    }

    /// Returns `true` if the listener was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(&id).is_some()
    }

    // ── Libraries ────────────────────────────────────────────────

    /// One-shot fetch of the server's library list.
    pub async fn get_libraries(&self) -> Result<Vec<Library>, CoreError> {
        Ok(self.inner.client.list_libraries().await?)
    }

    /// Fetch the library list and regenerate the per-library fields.
    /// Repeating this with an unchanged list leaves the field set as is.
    pub async fn load_libraries(&self) -> Result<Vec<Library>, CoreError> {
        let libraries = self.get_libraries().await?;
        let _gate = self.inner.gate.lock().await;
        let mut set = DescriptorSet::clone(&self.inner.descriptors.load_full());
        if set.expand_libraries(&libraries) {
            debug!(fields = set.len(), "field set regenerated");
            self.inner.descriptors.store(Arc::new(set));
        }
        Ok(libraries)
    }
}

/// Periodic refresh loop. The first tick of `interval` fires immediately,
/// and the initial cycle has already run by the time this starts.
async fn refresh_task(coordinator: Coordinator, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = coordinator.tick() => {}
                }
            }
        }
    }
}
