//! TrustGraph Engine
//!
//! In-memory trust analytics over a directed follow graph:
//! - Graph store with append-only ingest and snapshots
//! - PageRank (optionally time-decayed) and the published score index
//! - Trust paths, neighborhoods, similarity, and recommendations
//! - Topology health, communities, and risk analyzers
//! - A coordinator that recomputes on a cadence and notifies subscribers

pub mod community;
pub mod coordinator;
pub mod engine;
pub mod graph;
pub mod influence;
pub mod paths;
pub mod rank;
pub mod risk;
pub mod similarity;
pub mod simulate;
pub mod subscription;
pub mod temporal;
pub mod topology;

pub use coordinator::{BufferedSource, Coordinator, CoordinatorHandle, EdgeSource};
pub use engine::{Engine, EngineSettings, GraphStats, RecomputeOutcome};
pub use graph::{Adjacency, EdgeRecord, GraphStore, IndexedGraph};
pub use rank::{PageRankConfig, PageRankScorer, ScoreIndex};
pub use subscription::{ScoreUpdate, Subscription, SubscriptionSettings};
