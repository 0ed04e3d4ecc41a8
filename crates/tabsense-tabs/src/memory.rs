//! In-process tab source
//!
//! Keeps a tab table in memory and records every mutation request so
//! callers can inspect what the engine asked the host to do.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::TabError;
use crate::source::{SourceFuture, TabFilter, TabSource};
use crate::tab::{GroupId, TabId, TabRecord, WindowId};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabGroup {
    pub id: GroupId,
    pub tab_ids: Vec<TabId>,
    pub title: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    tabs: Vec<TabRecord>,
    current_window: Option<WindowId>,
    groups: Vec<TabGroup>,
    next_group: i64,
    discards: Vec<TabId>,
    navigations: Vec<(TabId, String)>,
    closed: Vec<TabId>,
    /// Tabs whose mutation requests fail
    failing: HashSet<TabId>,
}

pub struct MemoryTabSource {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryTabSource {
    pub fn new(current_window: WindowId) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                current_window: Some(current_window),
                next_group: 1,
                ..MemoryState::default()
            })),
        }
    }

    pub fn with_tabs<I>(current_window: WindowId, tabs: I) -> Self
    where
        I: IntoIterator<Item = TabRecord>,
    {
        let source = Self::new(current_window);
        for tab in tabs {
            source.insert(tab);
        }
        source
    }

    /// Add a tab, replacing any existing record with the same id
    pub fn insert(&self, tab: TabRecord) {
        let mut state = self.state.write();
        match state.tabs.iter_mut().find(|t| t.id == tab.id) {
            Some(existing) => *existing = tab,
            None => state.tabs.push(tab),
        }
    }

    pub fn remove(&self, id: TabId) -> Option<TabRecord> {
        let mut state = self.state.write();
        let index = state.tabs.iter().position(|t| t.id == id)?;
        Some(state.tabs.remove(index))
    }

    /// Simulate the user navigating a tab
    pub fn set_url(&self, id: TabId, url: impl Into<String>) -> Result<()> {
        let mut state = self.state.write();
        let tab = state
            .tabs
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TabError::NotFound(id))?;
        tab.url = Some(url.into());
        Ok(())
    }

    /// Make every mutation request against `id` fail
    pub fn fail_requests_for(&self, id: TabId) {
        self.state.write().failing.insert(id);
    }

    pub fn tabs(&self) -> Vec<TabRecord> {
        self.state.read().tabs.clone()
    }

    pub fn discards(&self) -> Vec<TabId> {
        self.state.read().discards.clone()
    }

    pub fn navigations(&self) -> Vec<(TabId, String)> {
        self.state.read().navigations.clone()
    }

    pub fn closed(&self) -> Vec<TabId> {
        self.state.read().closed.clone()
    }

    pub fn groups(&self) -> Vec<TabGroup> {
        self.state.read().groups.clone()
    }

    fn check_request(state: &MemoryState, id: TabId) -> Result<()> {
        if state.failing.contains(&id) {
            return Err(TabError::Host(format!("request rejected for tab {}", id)));
        }
        if !state.tabs.iter().any(|t| t.id == id) {
            return Err(TabError::NotFound(id));
        }
        Ok(())
    }

    fn close_one(state: &mut MemoryState, id: TabId) -> Result<()> {
        Self::check_request(state, id)?;
        state.tabs.retain(|t| t.id != id);
        state.closed.push(id);
        Ok(())
    }
}

impl TabSource for MemoryTabSource {
    fn list_tabs(&self, filter: TabFilter) -> SourceFuture<'_, Vec<TabRecord>> {
        Box::pin(async move {
            let state = self.state.read();
            Ok(state
                .tabs
                .iter()
                .filter(|tab| filter.matches(tab, state.current_window))
                .cloned()
                .collect())
        })
    }

    fn discard_tab(&self, id: TabId) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.write();
            Self::check_request(&state, id)?;
            if let Some(tab) = state.tabs.iter_mut().find(|t| t.id == id) {
                tab.is_discarded = true;
            }
            state.discards.push(id);
            Ok(())
        })
    }

    fn close_tab(&self, id: TabId) -> SourceFuture<'_, ()> {
        Box::pin(async move { Self::close_one(&mut self.state.write(), id) })
    }

    fn close_tabs(&self, ids: Vec<TabId>) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.write();
            // Validate the whole batch first; a host close call is all-or-nothing
            for id in &ids {
                Self::check_request(&state, *id)?;
            }
            for id in ids {
                Self::close_one(&mut state, id)?;
            }
            Ok(())
        })
    }

    fn navigate_tab(&self, id: TabId, url: String) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.write();
            Self::check_request(&state, id)?;
            if let Some(tab) = state.tabs.iter_mut().find(|t| t.id == id) {
                tab.url = Some(url.clone());
            }
            state.navigations.push((id, url));
            Ok(())
        })
    }

    fn group_tabs(&self, ids: Vec<TabId>) -> SourceFuture<'_, GroupId> {
        Box::pin(async move {
            let mut state = self.state.write();
            for id in &ids {
                Self::check_request(&state, *id)?;
            }
            let id = GroupId(state.next_group);
            state.next_group += 1;
            state.groups.push(TabGroup {
                id,
                tab_ids: ids,
                title: None,
            });
            Ok(id)
        })
    }

    fn set_group_title(&self, group: GroupId, title: String) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.write();
            let entry = state
                .groups
                .iter_mut()
                .find(|g| g.id == group)
                .ok_or_else(|| TabError::Host(format!("unknown group {}", group)))?;
            entry.title = Some(title);
            Ok(())
        })
    }
}

impl Clone for MemoryTabSource {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(id: i64, window: i64, url: &str) -> TabRecord {
        TabRecord::new(TabId(id), WindowId(window), Some(url.to_string()))
    }

    #[tokio::test]
    async fn test_list_respects_current_window() {
        let source = MemoryTabSource::with_tabs(
            WindowId(1),
            [tab(1, 1, "https://a.com"), tab(2, 2, "https://b.com")],
        );

        let all = source.list_tabs(TabFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);

        let current = source.list_tabs(TabFilter::current_window()).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, TabId(1));
    }

    #[tokio::test]
    async fn test_mutations_are_recorded() {
        let source = MemoryTabSource::with_tabs(
            WindowId(1),
            [tab(1, 1, "https://a.com"), tab(2, 1, "https://b.com")],
        );

        source.discard_tab(TabId(1)).await.unwrap();
        source
            .navigate_tab(TabId(2), "https://c.com".to_string())
            .await
            .unwrap();

        assert_eq!(source.discards(), vec![TabId(1)]);
        assert_eq!(
            source.navigations(),
            vec![(TabId(2), "https://c.com".to_string())]
        );
        assert!(source.get_tab(TabId(1)).await.unwrap().is_discarded);
        assert_eq!(
            source.get_tab(TabId(2)).await.unwrap().url.as_deref(),
            Some("https://c.com")
        );

        source.close_tab(TabId(1)).await.unwrap();
        assert_eq!(source.get_tab(TabId(1)).await, Err(TabError::NotFound(TabId(1))));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let source = MemoryTabSource::with_tabs(WindowId(1), [tab(1, 1, "https://a.com")]);
        source.fail_requests_for(TabId(1));

        assert!(matches!(
            source.discard_tab(TabId(1)).await,
            Err(TabError::Host(_))
        ));
        assert!(source.discards().is_empty());
        assert_eq!(
            source.discard_tab(TabId(9)).await,
            Err(TabError::NotFound(TabId(9)))
        );
    }

    #[tokio::test]
    async fn test_groups() {
        let source = MemoryTabSource::with_tabs(
            WindowId(1),
            [tab(1, 1, "https://a.com"), tab(2, 1, "https://a.com/x")],
        );

        let group = source.group_tabs(vec![TabId(1), TabId(2)]).await.unwrap();
        source
            .set_group_title(group, "a.com".to_string())
            .await
            .unwrap();

        let groups = source.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title.as_deref(), Some("a.com"));
        assert!(source
            .set_group_title(GroupId(99), "x".to_string())
            .await
            .is_err());
    }
}
