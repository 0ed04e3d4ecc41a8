//! TabSense Tab Model
//!
//! Read-only snapshots of the host browser's tabs, the [`TabSource`]
//! collaborator that supplies and mutates them, and the pure logic that
//! runs over a snapshot: classification, health scoring and hostname
//! bucketing for domain groups.

mod classifier;
mod error;
mod grouping;
mod health;
mod memory;
mod source;
mod tab;

pub use classifier::{
    find_duplicates, is_inactive, Category, ClassificationResult, Classifier, ClassifierConfig,
    DEFAULT_HEAVY_SITES,
};
pub use error::TabError;
pub use grouping::{bucket_by_hostname, group_by_domain, DomainGroup, GroupingReport};
pub use health::{HealthRank, HealthReport};
pub use memory::{MemoryTabSource, TabGroup};
pub use source::{LoadStatus, SourceFuture, TabChanges, TabEvent, TabFilter, TabSource};
pub use tab::{hostname, GroupId, TabId, TabRecord, WindowId};

pub type Result<T> = std::result::Result<T, TabError>;
