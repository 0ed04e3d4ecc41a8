//! Tab snapshot record
//!
//! A `TabRecord` is a point-in-time copy of what the host reports for one
//! tab. The engine never mutates records; it asks the [`TabSource`] to act
//! and re-reads a fresh snapshot.
//!
//! [`TabSource`]: crate::TabSource

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Opaque host handle for a tab, stable for the tab's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i64);

/// Handle of a visual tab group created by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    /// Host handle, unique within a snapshot
    pub id: TabId,
    /// Window the tab lives in
    pub window_id: WindowId,
    /// Absolute URL; absent while the host has not committed a navigation
    pub url: Option<String>,
    pub title: String,
    pub favicon_url: Option<String>,
    /// Last time the tab was focused; absent if never recorded
    pub last_active_at: Option<DateTime<Utc>>,
    /// Currently the focused tab in its window
    pub is_active: bool,
    pub is_audible: bool,
    pub is_pinned: bool,
    /// Content unloaded by the host; the tab stays in the strip
    pub is_discarded: bool,
}

impl TabRecord {
    pub fn new(id: TabId, window_id: WindowId, url: Option<String>) -> Self {
        Self {
            id,
            window_id,
            url,
            title: String::new(),
            favicon_url: None,
            last_active_at: None,
            is_active: false,
            is_audible: false,
            is_pinned: false,
            is_discarded: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_last_active_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_active_at = Some(at);
        self
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }

    pub fn audible(mut self) -> Self {
        self.is_audible = true;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.is_pinned = true;
        self
    }

    /// Hostname of the tab's URL, if it has one and it parses
    pub fn hostname(&self) -> Option<String> {
        self.url.as_deref().and_then(hostname)
    }

    /// Get display title (with fallback to URL)
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            self.url.as_deref().unwrap_or("")
        } else {
            &self.title
        }
    }
}

/// Extract the lowercased hostname of an absolute URL.
///
/// Returns `None` for malformed URLs and for URLs without a host
/// (`about:blank`, `data:` and friends).
pub fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(|host| host.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname() {
        assert_eq!(
            hostname("https://mail.google.com/inbox").as_deref(),
            Some("mail.google.com")
        );
        assert_eq!(hostname("HTTP://Example.COM").as_deref(), Some("example.com"));
        assert_eq!(hostname("not a url"), None);
        assert_eq!(hostname("about:blank"), None);
    }

    #[test]
    fn test_record_without_url() {
        let tab = TabRecord::new(TabId(1), WindowId(1), None);
        assert_eq!(tab.hostname(), None);
        assert_eq!(tab.display_title(), "");
    }

    #[test]
    fn test_display_title_falls_back_to_url() {
        let tab = TabRecord::new(TabId(1), WindowId(1), Some("https://a.com".into()));
        assert_eq!(tab.display_title(), "https://a.com");

        let titled = tab.with_title("A");
        assert_eq!(titled.display_title(), "A");
    }

    #[test]
    fn test_serializes_camel_case() {
        let tab = TabRecord::new(TabId(7), WindowId(2), Some("https://a.com".into())).pinned();
        let json = serde_json::to_value(&tab).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["windowId"], 2);
        assert_eq!(json["isPinned"], true);
    }
}
