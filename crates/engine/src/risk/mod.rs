//! Risk and quality analyzers
//!
//! Every analyzer is a pure function of an adjacency view and a score
//! index:
//! - `sybil`: five-signal genuineness score
//! - `anomaly`: rule-based flags with severities
//! - `follow_quality`: how trustworthy someone's follows are
//! - `trust_circle`: mutual circles and pairwise comparison
//! - `reputation`: composite grade over the others

pub mod anomaly;
pub mod follow_quality;
pub mod reputation;
pub mod sybil;
pub mod trust_circle;

pub use anomaly::{Anomaly, AnomalyKind, AnomalyReport, RiskLevel, Severity};
pub use follow_quality::{FollowQualityClass, FollowQualityReport, FollowSuggestion};
pub use reputation::{Grade, Reputation};
pub use sybil::{SybilClass, SybilReport};
pub use trust_circle::{CircleComparison, CompareInputs, Compatibility, TrustCircle};
