//! TabSense Core
//!
//! Central coordination layer. One engine task owns the focus session and
//! the auto-clean setting; everything else talks to it through an
//! [`EngineHandle`].

mod autoclean;
mod clock;
mod config;
mod dashboard;
mod engine;
mod error;
mod notify;

pub use autoclean::{sweep, AutoClean, SweepReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use dashboard::Dashboard;
pub use engine::{Engine, EngineHandle};
pub use error::CoreError;
pub use notify::{LogNotifier, Notification, Notifier, NotifyFuture};

// Re-export core components
pub use tabsense_focus::{
    Allowlist, Enforcer, FocusError, FocusManager, FocusSession, Restored, Verdict,
};
pub use tabsense_storage::{Database, StorageError};
pub use tabsense_tabs::{
    Category, ClassificationResult, Classifier, ClassifierConfig, GroupId, GroupingReport,
    HealthRank, HealthReport, LoadStatus, MemoryTabSource, TabChanges, TabError, TabEvent,
    TabFilter, TabId, TabRecord, TabSource, WindowId,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
