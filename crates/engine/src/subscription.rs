//! Score update subscriptions
//!
//! Each subscriber names a subset of identities and receives one update
//! per recompute through a bounded channel. A push that times out or hits
//! a closed receiver unregisters the subscriber.

use crate::rank::ScoreIndex;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use trustgraph_common::{AppError, Identity, Result};
use uuid::Uuid;

/// Score entry for one subscribed identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEntry {
    pub pubkey: Identity,
    pub raw: f64,
    pub normalized: u32,

    /// Normalized score under the replaced index, if there was one
    pub previous_normalized: Option<u32>,

    pub rank: usize,
    pub percentile: f64,
}

/// Message pushed to a subscriber after a recompute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub computed_at: DateTime<Utc>,
    pub graph_size: usize,
    pub entries: Vec<UpdateEntry>,
}

impl ScoreUpdate {
    /// Build the update for one subset
    pub fn for_subset(previous: Option<&ScoreIndex>, current: &ScoreIndex, subset: &[Identity]) -> Self {
        let entries = subset
            .iter()
            .map(|id| UpdateEntry {
                pubkey: *id,
                raw: current.raw(id),
                normalized: current.normalized(id),
                previous_normalized: previous.map(|p| p.normalized(id)),
                rank: current.rank(id),
                percentile: current.percentile(id),
            })
            .collect();

        Self {
            computed_at: current.computed_at(),
            graph_size: current.len(),
            entries,
        }
    }
}

/// Subscription limits
#[derive(Debug, Clone)]
pub struct SubscriptionSettings {
    pub max_subset: usize,
    pub push_timeout: Duration,
    pub channel_capacity: usize,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            max_subset: 100,
            push_timeout: Duration::from_secs(5),
            channel_capacity: 16,
        }
    }
}

struct Subscriber {
    id: Uuid,

    /// Identities of interest, guarded per connection
    subset: Mutex<Vec<Identity>>,

    sink: mpsc::Sender<ScoreUpdate>,
}

struct RegistryInner {
    subscribers: Mutex<HashMap<Uuid, Arc<Subscriber>>>,
    settings: SubscriptionSettings,
}

impl RegistryInner {
    fn remove(&self, id: &Uuid) -> bool {
        self.subscribers.lock().remove(id).is_some()
    }
}

/// All live subscribers
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<RegistryInner>,
}

impl SubscriberRegistry {
    pub fn new(settings: SubscriptionSettings) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                subscribers: Mutex::new(HashMap::new()),
                settings,
            }),
        }
    }

    fn check_subset(&self, subset: &[Identity]) -> Result<()> {
        let limit = self.inner.settings.max_subset;
        if subset.len() > limit {
            return Err(AppError::ResourceExhausted {
                size: subset.len(),
                limit,
            });
        }
        Ok(())
    }

    /// Register a subscriber for `subset`
    pub fn subscribe(&self, subset: Vec<Identity>) -> Result<Subscription> {
        self.check_subset(&subset)?;

        let (sink, receiver) = mpsc::channel(self.inner.settings.channel_capacity.max(1));
        let id = Uuid::new_v4();
        let subscriber = Arc::new(Subscriber {
            id,
            subset: Mutex::new(subset),
            sink,
        });

        let active = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.insert(id, subscriber);
            subscribers.len()
        };
        trustgraph_common::metrics::record_subscribers(active, 0);
        debug!(subscriber = %id, active, "Subscriber registered");

        Ok(Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.inner),
        })
    }

    /// Replace the subset of a live subscriber
    pub fn update_subset(&self, id: Uuid, subset: Vec<Identity>) -> Result<()> {
        self.check_subset(&subset)?;

        let subscriber = self
            .inner
            .subscribers
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound {
                resource_type: "subscriber".to_string(),
                id: id.to_string(),
            })?;

        *subscriber.subset.lock() = subset;
        Ok(())
    }

    /// Number of live subscribers
    pub fn len(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push one update to every subscriber; returns how many were delivered
    pub async fn broadcast(&self, previous: Option<&ScoreIndex>, current: &ScoreIndex) -> usize {
        // Enumerate under a short lock, push without it
        let subscribers: Vec<Arc<Subscriber>> = self.inner.subscribers.lock().values().cloned().collect();
        if subscribers.is_empty() {
            return 0;
        }

        let timeout = self.inner.settings.push_timeout;
        let pushes = subscribers.iter().map(|subscriber| {
            let update = {
                let subset = subscriber.subset.lock();
                ScoreUpdate::for_subset(previous, current, &subset)
            };
            async move {
                let result = subscriber.sink.send_timeout(update, timeout).await;
                (subscriber.id, result.is_ok())
            }
        });

        let results = join_all(pushes).await;
        let mut delivered = 0;
        let mut failed = 0;
        for (id, ok) in results {
            if ok {
                delivered += 1;
            } else if self.inner.remove(&id) {
                failed += 1;
                warn!(subscriber = %id, "Dropped subscriber after failed push");
            }
        }

        trustgraph_common::metrics::record_subscribers(self.len(), failed);
        delivered
    }
}

/// Receiving end of a subscription; unregisters on drop
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::Receiver<ScoreUpdate>,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next update; `None` once the subscriber has been dropped by the registry
    pub async fn recv(&mut self) -> Option<ScoreUpdate> {
        self.receiver.recv().await
    }

    /// Adapt into a stream of updates
    pub fn into_stream(self) -> impl Stream<Item = ScoreUpdate> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.recv().await.map(|update| (update, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(&self.id) {
                debug!(subscriber = %self.id, "Subscriber closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use trustgraph_common::errors::ErrorCode;

    fn id(n: u64) -> Identity {
        Identity::from_u64(n)
    }

    fn index(values: &[(u64, f64)]) -> ScoreIndex {
        ScoreIndex::new(values.iter().map(|(n, s)| (id(*n), *s)).collect(), Utc::now())
    }

    fn registry(push_timeout: Duration, capacity: usize) -> SubscriberRegistry {
        SubscriberRegistry::new(SubscriptionSettings {
            max_subset: 3,
            push_timeout,
            channel_capacity: capacity,
        })
    }

    #[tokio::test]
    async fn test_update_carries_only_subset() {
        let registry = registry(Duration::from_secs(1), 4);
        let mut sub = registry.subscribe(vec![id(1), id(9)]).unwrap();

        let previous = index(&[(1, 0.2), (2, 0.8)]);
        let current = index(&[(1, 0.6), (2, 0.4)]);
        assert_eq!(registry.broadcast(Some(&previous), &current).await, 1);

        let update = sub.recv().await.unwrap();
        assert_eq!(update.graph_size, 2);
        assert_eq!(update.entries.len(), 2);
        assert_eq!(update.entries[0].pubkey, id(1));
        assert_eq!(update.entries[0].rank, 1);
        assert!(update.entries[0].previous_normalized.is_some());
        assert_eq!(update.entries[1].rank, 0);
    }

    #[test]
    fn test_update_wire_format() {
        let current = index(&[(1, 0.5)]);
        let update = ScoreUpdate::for_subset(None, &current, &[id(1)]);

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["entries"][0]["pubkey"], id(1).to_hex());
        assert!(json["entries"][0]["previous_normalized"].is_null());

        let back: ScoreUpdate = serde_json::from_value(json).unwrap();
        assert_eq!(back, update);
    }

    #[tokio::test]
    async fn test_oversized_subset_rejected() {
        let registry = registry(Duration::from_secs(1), 4);
        let err = registry
            .subscribe((0..4).map(id).collect())
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::ResourceExhausted);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let registry = registry(Duration::from_secs(1), 4);
        let sub = registry.subscribe(vec![id(1)]).unwrap();
        assert_eq!(registry.len(), 1);
        drop(sub);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_subscriber_is_dropped() {
        let registry = registry(Duration::from_millis(20), 1);
        let sub = registry.subscribe(vec![id(1)]).unwrap();
        let current = index(&[(1, 1.0)]);

        // First push fills the channel, second times out
        assert_eq!(registry.broadcast(None, &current).await, 1);
        assert_eq!(registry.broadcast(None, &current).await, 0);
        assert!(registry.is_empty());

        // Already-buffered update is still readable, then the stream ends
        let updates: Vec<ScoreUpdate> = sub.into_stream().collect().await;
        assert_eq!(updates.len(), 1);
    }

    #[tokio::test]
    async fn test_update_subset() {
        let registry = registry(Duration::from_secs(1), 4);
        let mut sub = registry.subscribe(vec![id(1)]).unwrap();
        registry.update_subset(sub.id(), vec![id(2), id(3)]).unwrap();

        registry.broadcast(None, &index(&[(2, 0.5), (3, 0.5)])).await;
        let update = sub.recv().await.unwrap();
        let keys: Vec<Identity> = update.entries.iter().map(|e| e.pubkey).collect();
        assert_eq!(keys, vec![id(2), id(3)]);

        let missing = registry.update_subset(Uuid::new_v4(), vec![]);
        assert!(missing.is_err());
    }
}
