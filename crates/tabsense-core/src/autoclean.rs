//! Auto-clean
//!
//! When enabled, each alarm tick discards background tabs that have been
//! idle past the sweep threshold. Pinned and audible tabs are never
//! touched. Each discard is independent: one failing tab is logged and the
//! sweep moves on.

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tabsense_storage::{Database, AUTO_CLEAN_KEY};
use tabsense_tabs::{is_inactive, TabFilter, TabId, TabSource};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub discarded: Vec<TabId>,
    pub failed: Vec<TabId>,
}

/// The persisted on/off switch
pub struct AutoClean {
    enabled: Arc<RwLock<bool>>,
    db: Database,
}

impl AutoClean {
    pub fn new(db: Database) -> Self {
        Self {
            enabled: Arc::new(RwLock::new(false)),
            db,
        }
    }

    /// Load the persisted flag. Absent or unreadable means off.
    pub fn load(&self) -> bool {
        let enabled = match self.db.get_json::<bool>(AUTO_CLEAN_KEY) {
            Ok(value) => value.unwrap_or(false),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable auto-clean setting");
                false
            }
        };

        *self.enabled.write() = enabled;
        enabled
    }

    pub fn set(&self, enabled: bool) -> Result<()> {
        self.db.set_json(AUTO_CLEAN_KEY, &enabled)?;
        *self.enabled.write() = enabled;

        tracing::info!(enabled, "Auto-clean toggled");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.read()
    }
}

impl Clone for AutoClean {
    fn clone(&self) -> Self {
        Self {
            enabled: Arc::clone(&self.enabled),
            db: self.db.clone(),
        }
    }
}

/// Run one sweep against a fresh snapshot.
///
/// Only a failed snapshot read is an error; discard failures are collected
/// in the report.
pub async fn sweep(
    source: &dyn TabSource,
    now: DateTime<Utc>,
    threshold: Duration,
) -> Result<SweepReport> {
    let tabs = source.list_tabs(TabFilter::inactive_and_silent()).await?;

    let candidates: Vec<TabId> = tabs
        .iter()
        .filter(|tab| !tab.is_pinned)
        .filter(|tab| is_inactive(tab, now, threshold))
        .map(|tab| tab.id)
        .collect();

    let outcomes = join_all(candidates.into_iter().map(|id| async move {
        (id, source.discard_tab(id).await)
    }))
    .await;

    let mut report = SweepReport::default();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                tracing::info!(tab_id = %id, "Auto-discarded tab");
                report.discarded.push(id);
            }
            Err(e) => {
                tracing::warn!(tab_id = %id, error = %e, "Failed to discard tab");
                report.failed.push(id);
            }
        }
    }

    Ok(report)
}
