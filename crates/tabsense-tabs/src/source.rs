//! Snapshot source
//!
//! The host browser sits behind [`TabSource`]. Every call is asynchronous
//! and individually fallible; callers treat a failed request as "skip this
//! tab" rather than aborting whatever batch they are running.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::TabError;
use crate::tab::{GroupId, TabId, TabRecord, WindowId};
use crate::Result;

/// Boxed future returned by [`TabSource`] methods, keeping the trait
/// dyn-compatible
pub type SourceFuture<'a, T> = BoxFuture<'a, Result<T>>;

pub trait TabSource: Send + Sync {
    /// Current tabs matching `filter`, in host order
    fn list_tabs(&self, filter: TabFilter) -> SourceFuture<'_, Vec<TabRecord>>;

    /// Unload a tab's content while keeping it in the tab strip
    fn discard_tab(&self, id: TabId) -> SourceFuture<'_, ()>;

    fn close_tab(&self, id: TabId) -> SourceFuture<'_, ()>;

    fn close_tabs(&self, ids: Vec<TabId>) -> SourceFuture<'_, ()>;

    fn navigate_tab(&self, id: TabId, url: String) -> SourceFuture<'_, ()>;

    /// Put tabs into a new visual group, returning its handle
    fn group_tabs(&self, ids: Vec<TabId>) -> SourceFuture<'_, GroupId>;

    fn set_group_title(&self, group: GroupId, title: String) -> SourceFuture<'_, ()>;

    /// Fetch a single tab. The default scans a full snapshot.
    fn get_tab(&self, id: TabId) -> SourceFuture<'_, TabRecord> {
        Box::pin(async move {
            self.list_tabs(TabFilter::all())
                .await?
                .into_iter()
                .find(|tab| tab.id == id)
                .ok_or(TabError::NotFound(id))
        })
    }
}

/// Query filter for [`TabSource::list_tabs`]. `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabFilter {
    pub active: Option<bool>,
    pub audible: Option<bool>,
    pub pinned: Option<bool>,
    /// Restrict to the host's current window
    pub current_window: bool,
}

impl TabFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn current_window() -> Self {
        Self {
            current_window: true,
            ..Self::default()
        }
    }

    /// Tabs that are neither focused nor playing audio
    pub fn inactive_and_silent() -> Self {
        Self {
            active: Some(false),
            audible: Some(false),
            ..Self::default()
        }
    }

    pub fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    /// Check a record against the filter. `current` is the host's current
    /// window, consulted only when `current_window` is set.
    pub fn matches(&self, tab: &TabRecord, current: Option<WindowId>) -> bool {
        if self.active.is_some_and(|active| tab.is_active != active) {
            return false;
        }
        if self.audible.is_some_and(|audible| tab.is_audible != audible) {
            return false;
        }
        if self.pinned.is_some_and(|pinned| tab.is_pinned != pinned) {
            return false;
        }
        if self.current_window && current != Some(tab.window_id) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// Fields changed by an `Updated` event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabChanges {
    /// New URL, present only when the URL changed
    pub url: Option<String>,
    pub status: Option<LoadStatus>,
}

/// Change feed emitted by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TabEvent {
    Created { id: TabId },
    Updated { id: TabId, changes: TabChanges },
    Removed { id: TabId },
}

impl TabEvent {
    pub fn tab_id(&self) -> TabId {
        match self {
            TabEvent::Created { id } | TabEvent::Updated { id, .. } | TabEvent::Removed { id } => {
                *id
            }
        }
    }

    /// Whether this event should trigger allowlist enforcement: a finished
    /// load, or a committed URL change.
    pub fn is_navigation(&self) -> bool {
        match self {
            TabEvent::Updated { changes, .. } => {
                changes.url.is_some() || changes.status == Some(LoadStatus::Complete)
            }
            _ => false,
        }
    }
}
