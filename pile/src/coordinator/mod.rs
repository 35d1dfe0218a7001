//! Single-flight render coordination.
//!
//! Every cache key has at most one active [`RenderSlot`]. The first caller
//! for a key creates the slot and queues it; later callers join it as extra
//! waiters and never build a spec or reach the renderer themselves.
//!
//! ```text
//!  request_render ──► slots (DashMap entry) ──► joined? wait
//!                              │ created
//!                              ▼
//!                      RenderQueue (priority, FIFO)
//!                              │
//!                   N workers ─┴─► RenderPipeline ──► cache put ──► waiters
//!                              ▲                  │ failed
//!                              └──── requeue ◄────┘ (attempt < max)
//! ```
//!
//! A sweeper task requeues slots that stay in `Rendering` past the liveness
//! threshold. Each requeue moves the slot to a new run id, so whatever the
//! stalled run reports later is ignored, except a success, which still
//! completes the slot if nothing else has.

mod policy;
mod queue;
mod slot;

pub use policy::{
    Priority, RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_SECS,
};
pub use slot::{RenderOutcome, SpecFactory};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::TileCacheClient;
use crate::render::{RenderError, RenderPipeline, RenderSpec};
use crate::telemetry::TileMetrics;
use crate::tile::{CacheKey, TileBlob};
use queue::{QueuedRender, RenderQueue};
use slot::{RenderSlot, SlotState};

/// Upper bound on one render attempt.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an attempt may stay in flight before the sweeper requeues it.
pub const DEFAULT_LIVENESS_THRESHOLD: Duration = Duration::from_secs(60);

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Available cores minus two, at least one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub workers: usize,
    pub retry: RetryPolicy,
    pub render_timeout: Duration,
    pub liveness_threshold: Duration,
    pub sweep_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            retry: RetryPolicy::default(),
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            liveness_threshold: DEFAULT_LIVENESS_THRESHOLD,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn with_liveness_threshold(mut self, threshold: Duration) -> Self {
        self.liveness_threshold = threshold;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Current slot population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    pub workers: usize,
    pub queued: usize,
    pub rendering: usize,
    pub waiters: usize,
    /// Queue entries, stale ones included.
    pub queue_depth: usize,
}

struct Inner {
    slots: DashMap<CacheKey, RenderSlot>,
    queue: Mutex<RenderQueue>,
    ready: Notify,
    ids: AtomicU64,
    pipeline: RenderPipeline,
    cache: Arc<TileCacheClient>,
    metrics: Arc<TileMetrics>,
    config: CoordinatorConfig,
    shutdown: CancellationToken,
}

/// Runs renders on a fixed worker pool with per-key single-flight.
pub struct RenderCoordinator {
    inner: Arc<Inner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RenderCoordinator {
    /// Spawns the workers and the stuck-render sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: CoordinatorConfig,
        pipeline: RenderPipeline,
        cache: Arc<TileCacheClient>,
        metrics: Arc<TileMetrics>,
    ) -> Self {
        let workers = config.workers.max(1);
        let inner = Arc::new(Inner {
            slots: DashMap::new(),
            queue: Mutex::new(RenderQueue::default()),
            ready: Notify::new(),
            ids: AtomicU64::new(1),
            pipeline,
            cache,
            metrics,
            config,
            shutdown: CancellationToken::new(),
        });

        let mut tasks = Vec::with_capacity(workers + 1);
        for worker_id in 0..workers {
            tasks.push(tokio::spawn(Arc::clone(&inner).worker_loop(worker_id)));
        }
        tasks.push(tokio::spawn(Arc::clone(&inner).sweep_loop()));

        info!(
            workers,
            max_attempts = inner.config.retry.max_attempts(),
            timeout_ms = inner.config.render_timeout.as_millis() as u64,
            "Render coordinator started"
        );

        Self {
            inner,
            tasks: Mutex::new(tasks),
        }
    }

    /// Renders `key`, or joins the render already in progress for it.
    ///
    /// `factory` is kept only when this call creates the slot. It runs once
    /// per attempt, so each attempt gets a freshly built spec.
    pub async fn request_render<F>(
        &self,
        key: CacheKey,
        priority: Priority,
        factory: F,
    ) -> RenderOutcome
    where
        F: Fn() -> RenderSpec + Send + Sync + 'static,
    {
        if self.inner.shutdown.is_cancelled() {
            return Err(RenderError::ShuttingDown);
        }

        let lookup = key.clone();
        let (tx, rx) = oneshot::channel();
        let job = match self.inner.slots.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                slot.waiters.push(tx);
                self.inner.metrics.render_coalesced();
                debug!(key = %key, waiters = slot.waiters.len(), "Joined in-flight render");

                // a higher-priority waiter lifts a slot that is still queued
                if priority > slot.priority {
                    slot.priority = priority;
                    (slot.state == SlotState::Queued)
                        .then(|| QueuedRender::new(key, slot.slot_id, slot.run_id, priority))
                } else {
                    None
                }
            }
            Entry::Vacant(entry) => {
                let slot_id = self.inner.next_id();
                entry.insert(RenderSlot::new(slot_id, priority, Arc::new(factory), tx));
                self.inner.metrics.render_requested();
                debug!(key = %key, %priority, "Render queued");
                Some(QueuedRender::new(key, slot_id, slot_id, priority))
            }
        };

        if let Some(job) = job {
            self.inner.enqueue(job);
        }

        // shutdown may have drained the slots before this one landed
        if self.inner.shutdown.is_cancelled() {
            if let Some((_, slot)) = self.inner.slots.remove(&lookup) {
                slot.resolve(Err(RenderError::ShuttingDown));
            }
        }

        rx.await.unwrap_or(Err(RenderError::ShuttingDown))
    }

    pub fn stats(&self) -> CoordinatorStats {
        let mut stats = CoordinatorStats {
            workers: self.inner.config.workers.max(1),
            queue_depth: self.inner.queue.lock().len(),
            ..Default::default()
        };
        for slot in self.inner.slots.iter() {
            match slot.state {
                SlotState::Queued => stats.queued += 1,
                SlotState::Rendering { .. } => stats.rendering += 1,
            }
            stats.waiters += slot.waiters.len();
        }
        stats
    }

    /// Requeues renders stuck past the liveness threshold. Returns how many
    /// slots were requeued or failed.
    pub fn sweep_stuck(&self) -> usize {
        self.inner.sweep_stuck()
    }

    /// Stops the workers and the sweeper. Every pending waiter receives
    /// [`RenderError::ShuttingDown`].
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }

        self.inner.queue.lock().clear();
        let keys: Vec<CacheKey> = self.inner.slots.iter().map(|s| s.key().clone()).collect();
        let mut drained = 0;
        for key in keys {
            if let Some((_, slot)) = self.inner.slots.remove(&key) {
                slot.resolve(Err(RenderError::ShuttingDown));
                drained += 1;
            }
        }
        info!(drained, "Render coordinator stopped");
    }
}

impl Drop for RenderCoordinator {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }

    fn enqueue(&self, job: QueuedRender) {
        self.queue.lock().push(job);
        self.ready.notify_one();
    }

    fn requeue_after(self: &Arc<Self>, job: QueuedRender, delay: Duration) {
        if delay.is_zero() {
            self.enqueue(job);
            return;
        }
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => inner.enqueue(job),
            }
        });
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        debug!(worker_id, "Render worker started");
        loop {
            let job = loop {
                let popped = {
                    let mut queue = self.queue.lock();
                    let job = queue.pop();
                    if job.is_some() && !queue.is_empty() {
                        self.ready.notify_one();
                    }
                    job
                };
                if let Some(job) = popped {
                    break job;
                }
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        debug!(worker_id, "Render worker stopped");
                        return;
                    }
                    _ = self.ready.notified() => {}
                }
            };

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!(worker_id, "Render worker stopped mid-render");
                    return;
                }
                _ = self.run(job) => {}
            }
        }
    }

    /// Claims the slot for `job` and runs one attempt.
    async fn run(self: &Arc<Self>, job: QueuedRender) {
        let claimed = match self.slots.get_mut(&job.key) {
            Some(mut slot)
                if slot.slot_id == job.slot_id
                    && slot.run_id == job.run_id
                    && slot.state == SlotState::Queued =>
            {
                slot.attempt += 1;
                slot.state = SlotState::Rendering {
                    started_at: Instant::now(),
                };
                Some((Arc::clone(&slot.factory), slot.attempt))
            }
            _ => None,
        };
        let Some((factory, attempt)) = claimed else {
            debug!(key = %job.key, run_id = job.run_id, "Dropping stale queue entry");
            return;
        };

        self.metrics.render_attempt_started();
        debug!(key = %job.key, attempt, priority = %job.priority, "Render attempt started");

        let started = Instant::now();
        let pipeline = self.pipeline.clone();
        let timeout = self.config.render_timeout;
        let attempt_task = tokio::spawn(async move {
            let spec = factory();
            tokio::time::timeout(timeout, pipeline.run(&spec)).await
        });

        let outcome = match attempt_task.await {
            Ok(Ok(result)) => result,
            Ok(Err(_elapsed)) => Err(RenderError::Timeout(timeout)),
            Err(e) if e.is_panic() => Err(RenderError::Panicked(e.to_string())),
            Err(e) => Err(RenderError::Engine(format!("render task cancelled: {}", e))),
        };

        match outcome {
            Ok(blob) => self.succeed(&job, blob, started.elapsed()).await,
            Err(err) => self.fail(&job, attempt, err),
        }
    }

    async fn succeed(&self, job: &QueuedRender, blob: TileBlob, elapsed: Duration) {
        let live = self
            .slots
            .get(&job.key)
            .is_some_and(|slot| slot.slot_id == job.slot_id);
        if !live {
            debug!(key = %job.key, "Discarding result for a slot that is already resolved");
            return;
        }

        // write-through completes before any waiter sees the bytes
        self.cache.put(&job.key, &blob).await;

        if let Some((_, slot)) = self
            .slots
            .remove_if(&job.key, |_, slot| slot.slot_id == job.slot_id)
        {
            if slot.run_id != job.run_id {
                debug!(key = %job.key, "Superseded run completed the slot");
            }
            self.metrics.render_succeeded(elapsed.as_micros() as u64);
            debug!(
                key = %job.key,
                bytes = blob.len(),
                waiters = slot.waiters.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Render succeeded"
            );
            slot.resolve(Ok(blob));
        }
    }

    fn fail(self: &Arc<Self>, job: &QueuedRender, attempt: u32, err: RenderError) {
        self.metrics.render_attempt_failed();

        let max_attempts = self.config.retry.max_attempts();
        let mut requeue = None;
        let mut exhausted = None;

        match self.slots.entry(job.key.clone()) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                if slot.slot_id != job.slot_id || slot.run_id != job.run_id {
                    debug!(key = %job.key, error = %err, "Ignoring failure of a superseded run");
                    return;
                }

                if slot.attempt >= max_attempts {
                    exhausted = Some((entry.remove(), err));
                } else {
                    warn!(
                        key = %job.key,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Render attempt failed, retrying"
                    );
                    slot.run_id = self.next_id();
                    slot.state = SlotState::Queued;
                    slot.last_error = Some(err);
                    let delay = self
                        .config
                        .retry
                        .delay_for_attempt(slot.attempt)
                        .unwrap_or_default();
                    requeue = Some((
                        QueuedRender::new(job.key.clone(), slot.slot_id, slot.run_id, slot.priority),
                        delay,
                    ));
                }
            }
            Entry::Vacant(_) => return,
        }

        if let Some((job, delay)) = requeue {
            self.requeue_after(job, delay);
        }
        if let Some((slot, last)) = exhausted {
            self.exhaust(&job.key, slot, last);
        }
    }

    fn exhaust(&self, key: &CacheKey, slot: RenderSlot, last: RenderError) {
        self.metrics.render_exhausted();
        warn!(
            key = %key,
            attempts = slot.attempt,
            waiters = slot.waiters.len(),
            error = %last,
            "Render failed, retries exhausted"
        );
        let attempts = slot.attempt;
        slot.resolve(Err(RenderError::Exhausted {
            attempts,
            last: Box::new(last),
        }));
    }

    async fn sweep_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = ticker.tick() => {
                    self.sweep_stuck();
                }
            }
        }
    }

    fn sweep_stuck(self: &Arc<Self>) -> usize {
        let threshold = self.config.liveness_threshold;
        let stuck: Vec<CacheKey> = self
            .slots
            .iter()
            .filter(|slot| {
                matches!(slot.state, SlotState::Rendering { started_at } if started_at.elapsed() > threshold)
            })
            .map(|slot| slot.key().clone())
            .collect();

        let max_attempts = self.config.retry.max_attempts();
        let mut swept = 0;

        for key in stuck {
            let Entry::Occupied(mut entry) = self.slots.entry(key.clone()) else {
                continue;
            };
            let elapsed = match entry.get().state {
                SlotState::Rendering { started_at } if started_at.elapsed() > threshold => {
                    started_at.elapsed()
                }
                _ => continue,
            };
            swept += 1;

            if entry.get().attempt >= max_attempts {
                let slot = entry.remove();
                self.exhaust(&key, slot, RenderError::Stalled(elapsed));
                continue;
            }

            let slot = entry.get_mut();
            slot.run_id = self.next_id();
            slot.state = SlotState::Queued;
            slot.last_error = Some(RenderError::Stalled(elapsed));
            let job = QueuedRender::new(key.clone(), slot.slot_id, slot.run_id, slot.priority);
            drop(entry);

            self.metrics.stuck_render_requeued();
            warn!(key = %key, elapsed_ms = elapsed.as_millis() as u64, "Requeued stuck render");
            self.enqueue(job);
        }

        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BoxFuture, Cache, MemoryCacheProvider};
    use crate::coord::TileCoord;
    use crate::render::{
        CompiledStyle, ConnectionParams, Datasource, PassthroughStyleCompiler, RenderedTile,
        Renderer,
    };
    use crate::tile::{StyleHash, TileFormat, TileRequest};
    use bytes::Bytes;
    use std::sync::atomic::AtomicU32;

    /// Fails the first `failures` calls, then returns the call number.
    struct FlakyRenderer {
        calls: AtomicU32,
        failures: u32,
    }

    impl Renderer for FlakyRenderer {
        fn render<'a>(
            &'a self,
            _spec: &'a RenderSpec,
            _style: &'a CompiledStyle,
        ) -> BoxFuture<'a, Result<RenderedTile, RenderError>> {
            Box::pin(async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call <= self.failures {
                    return Err(RenderError::Datasource(format!("failure {}", call)));
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(RenderedTile {
                    bytes: Bytes::from(vec![call as u8]),
                    content_type: "image/png".into(),
                })
            })
        }
    }

    fn spec() -> RenderSpec {
        RenderSpec {
            z: 1,
            bbox: [0.0, 0.0, 1.0, 1.0],
            width: 256,
            height: 256,
            buffer_size: 128,
            srs: crate::coord::MERCATOR_PROJ4.into(),
            style: "#layer {}".into(),
            style_version: "2.0.1".into(),
            layer_name: "layer".into(),
            datasource: Datasource::Postgis {
                connection: ConnectionParams {
                    host: "h".into(),
                    user: "u".into(),
                    password: "p".into(),
                },
                dbname: "d".into(),
                table: "t".into(),
                geometry_field: "geom".into(),
                srid: 3857,
                extent: None,
            },
            format: TileFormat::Png,
            quality: None,
            interactivity_fields: Vec::new(),
        }
    }

    fn key() -> CacheKey {
        let request = TileRequest::layer("L", TileCoord::new(1, 0, 0).unwrap(), TileFormat::Png);
        CacheKey::for_request(&request, StyleHash::of("#layer {}"))
    }

    fn coordinator(
        failures: u32,
        config: CoordinatorConfig,
    ) -> (RenderCoordinator, Arc<FlakyRenderer>, Arc<dyn Cache>) {
        let renderer = Arc::new(FlakyRenderer {
            calls: AtomicU32::new(0),
            failures,
        });
        let cache: Arc<dyn Cache> = Arc::new(MemoryCacheProvider::new(1 << 20, None));
        let metrics = Arc::new(TileMetrics::new());
        let pipeline = RenderPipeline::new(
            Arc::new(PassthroughStyleCompiler::new()),
            Arc::clone(&renderer) as Arc<dyn Renderer>,
        );
        let coordinator = RenderCoordinator::start(
            config,
            pipeline,
            Arc::new(TileCacheClient::new(Arc::clone(&cache), metrics.clone())),
            metrics,
        );
        (coordinator, renderer, cache)
    }

    #[tokio::test]
    async fn test_success_writes_through() {
        let (coordinator, renderer, cache) = coordinator(0, CoordinatorConfig::default().with_workers(2));

        let blob = coordinator
            .request_render(key(), Priority::HIGH, spec)
            .await
            .unwrap();

        assert_eq!(blob.bytes.as_ref(), &[1]);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&key().to_string()).await.unwrap(), Some(vec![1]));
        assert_eq!(coordinator.stats().queued + coordinator.stats().rendering, 0);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let (coordinator, renderer, _) = coordinator(3, CoordinatorConfig::default().with_workers(1));

        let blob = coordinator
            .request_render(key(), Priority::NORMAL, spec)
            .await
            .unwrap();

        assert_eq!(blob.bytes.as_ref(), &[4]);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 4);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let (coordinator, renderer, cache) =
            coordinator(u32::MAX, CoordinatorConfig::default().with_workers(2));

        let err = coordinator
            .request_render(key(), Priority::NORMAL, spec)
            .await
            .unwrap_err();

        match err {
            RenderError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 5);
                assert_eq!(*last, RenderError::Datasource("failure 5".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 5);
        assert_eq!(cache.entry_count(), 0);
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_request_after_shutdown() {
        let (coordinator, _, _) = coordinator(0, CoordinatorConfig::default().with_workers(1));
        coordinator.shutdown().await;

        let err = coordinator
            .request_render(key(), Priority::HIGH, spec)
            .await
            .unwrap_err();
        assert_eq!(err, RenderError::ShuttingDown);
    }

    #[test]
    fn test_default_workers_at_least_one() {
        assert!(default_workers() >= 1);
        assert_eq!(CoordinatorConfig::default().with_workers(0).workers, 1);
    }
}
