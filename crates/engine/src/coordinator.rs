//! Recompute coordinator
//!
//! One long-lived task runs the cycle:
//! crawl -> ingest -> PageRank + communities -> publish -> notify.
//! Cycles run on a fixed cadence and on demand; requests that arrive
//! while a cycle is running coalesce into a single follow-up cycle.

use crate::engine::Engine;
use crate::graph::EdgeRecord;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Where new follow edges come from
#[async_trait]
pub trait EdgeSource: Send + Sync {
    /// Fetch edges discovered since the last call
    async fn fetch(&self) -> anyhow::Result<Vec<EdgeRecord>>;

    /// Name for logs
    fn name(&self) -> &str;
}

/// Source fed by callers, drained on each cycle
#[derive(Default)]
pub struct BufferedSource {
    pending: Mutex<Vec<EdgeRecord>>,
}

impl BufferedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue edges for the next cycle
    pub fn push(&self, edges: impl IntoIterator<Item = EdgeRecord>) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.extend(edges);
        pending.len() - before
    }

    /// Number of queued edges
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

#[async_trait]
impl EdgeSource for BufferedSource {
    async fn fetch(&self) -> anyhow::Result<Vec<EdgeRecord>> {
        Ok(std::mem::take(&mut *self.pending.lock()))
    }

    fn name(&self) -> &str {
        "buffered"
    }
}

/// Drives periodic and manual recomputes
pub struct Coordinator {
    engine: Arc<Engine>,
    source: Arc<dyn EdgeSource>,
    interval: Duration,
}

impl Coordinator {
    pub fn new(engine: Arc<Engine>, source: Arc<dyn EdgeSource>, interval: Duration) -> Self {
        Self {
            engine,
            source,
            interval,
        }
    }

    /// Start the worker; the first cycle runs immediately
    pub fn spawn(self) -> CoordinatorHandle {
        let trigger = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(self.run(trigger.clone(), shutdown_rx));

        CoordinatorHandle {
            trigger,
            shutdown: shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    async fn run(self, trigger: Arc<Notify>, mut shutdown: watch::Receiver<bool>) {
        info!(
            source = self.source.name(),
            interval_secs = self.interval.as_secs(),
            "Coordinator started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = trigger.notified() => {}
                _ = shutdown.changed() => break,
            }

            if *shutdown.borrow() {
                break;
            }
            self.run_cycle().await;
        }

        info!("Coordinator stopped");
    }

    /// Crawl, recompute, and notify once
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn run_cycle(&self) -> bool {
        match self.source.fetch().await {
            Ok(edges) if !edges.is_empty() => {
                let added = self.engine.add_edges(edges);
                info!(added, "Crawl stage ingested edges");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Crawl failed, recomputing existing graph"),
        }

        let engine = self.engine.clone();
        match tokio::task::spawn_blocking(move || engine.recompute()).await {
            Ok(outcome) => {
                let delivered = self.engine.publish(&outcome).await;
                info!(
                    nodes = outcome.nodes,
                    edges = outcome.edges,
                    subscribers = delivered,
                    "Cycle complete"
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Recompute failed, keeping previous scores");
                trustgraph_common::metrics::record_recompute(0.0, 0, 0, false);
                false
            }
        }
    }
}

/// Control handle for a running coordinator
pub struct CoordinatorHandle {
    trigger: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CoordinatorHandle {
    /// Request a cycle as soon as the current one (if any) finishes
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Stop the loop and wait for the in-flight cycle
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Coordinator task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;
    use crate::subscription::SubscriptionSettings;
    use trustgraph_common::Identity;

    fn engine() -> Arc<Engine> {
        Arc::new(Engine::with_settings(
            EngineSettings::default(),
            SubscriptionSettings::default(),
        ))
    }

    fn edge(a: u64, b: u64) -> EdgeRecord {
        EdgeRecord::new(Identity::from_u64(a), Identity::from_u64(b))
    }

    struct FailingSource;

    #[async_trait]
    impl EdgeSource for FailingSource {
        async fn fetch(&self) -> anyhow::Result<Vec<EdgeRecord>> {
            anyhow::bail!("relay unreachable")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    async fn wait_until(check: impl Fn() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_buffered_source_drains() {
        let source = BufferedSource::new();
        assert_eq!(source.push(vec![edge(1, 2), edge(2, 3)]), 2);
        assert_eq!(source.fetch().await.unwrap().len(), 2);
        assert_eq!(source.pending(), 0);
        assert!(source.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cycle_ingests_and_publishes() {
        let engine = engine();
        let source = Arc::new(BufferedSource::new());
        source.push(vec![edge(1, 2), edge(2, 1)]);

        let coordinator = Coordinator::new(engine.clone(), source.clone(), Duration::from_secs(3600));
        assert!(coordinator.run_cycle().await);
        assert!(engine.is_ready());
        assert_eq!(engine.stats().edges, 2);
    }

    #[tokio::test]
    async fn test_crawl_failure_still_recomputes() {
        let engine = engine();
        engine.add_edge(Identity::from_u64(1), Identity::from_u64(2), None);

        let coordinator = Coordinator::new(engine.clone(), Arc::new(FailingSource), Duration::from_secs(3600));
        assert!(coordinator.run_cycle().await);
        assert!(engine.is_ready());
    }

    #[tokio::test]
    async fn test_spawned_loop_runs_and_triggers() {
        let engine = engine();
        let source = Arc::new(BufferedSource::new());
        source.push(vec![edge(1, 2)]);

        let handle = Coordinator::new(engine.clone(), source.clone(), Duration::from_secs(3600)).spawn();
        wait_until(|| engine.is_ready()).await;

        source.push(vec![edge(2, 3)]);
        handle.trigger();
        wait_until(|| engine.stats().edges == 2 && engine.stats().nodes == 3).await;
        wait_until(|| {
            engine
                .current_scores()
                .map(|s| s.len() == 3)
                .unwrap_or(false)
        })
        .await;

        handle.shutdown().await;
    }
}
