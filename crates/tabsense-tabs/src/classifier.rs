//! Tab classification
//!
//! Maps one snapshot onto three derived sets:
//!
//! ```text
//! inactive   not focused, last activation older than the threshold
//! duplicate  every member of an exact-URL group of size >= 2
//! heavy      audible, or URL contains a heavy-site entry
//! ```
//!
//! Sets may overlap. Classification is pure and holds no state, so it can
//! run on any thread.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tab::TabRecord;

/// Streaming, video and conferencing sites presumed resource-heavy
pub const DEFAULT_HEAVY_SITES: &[&str] = &[
    "youtube.com",
    "twitch.tv",
    "netflix.com",
    "figma.com",
    "meet.google.com",
    "zoom.us",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Inactive,
    Duplicate,
    Heavy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Idle time after which a background tab counts as inactive
    pub inactive_threshold: Duration,
    /// Substrings marking a URL as heavy
    pub heavy_sites: Vec<String>,
}

impl ClassifierConfig {
    pub fn new(inactive_threshold: Duration) -> Self {
        Self {
            inactive_threshold,
            heavy_sites: DEFAULT_HEAVY_SITES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::new(Duration::minutes(30))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub inactive: Vec<TabRecord>,
    pub duplicate: Vec<TabRecord>,
    pub heavy: Vec<TabRecord>,
}

impl ClassificationResult {
    pub fn get(&self, category: Category) -> &[TabRecord] {
        match category {
            Category::Inactive => &self.inactive,
            Category::Duplicate => &self.duplicate,
            Category::Heavy => &self.heavy,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn classify(&self, tabs: &[TabRecord], now: DateTime<Utc>) -> ClassificationResult {
        let inactive = tabs
            .iter()
            .filter(|tab| is_inactive(tab, now, self.config.inactive_threshold))
            .cloned()
            .collect();

        let heavy = tabs.iter().filter(|tab| self.is_heavy(tab)).cloned().collect();

        ClassificationResult {
            inactive,
            duplicate: find_duplicates(tabs),
            heavy,
        }
    }

    /// Audible, or the URL contains any heavy-site entry.
    ///
    /// Containment runs over the whole URL string, so a heavy domain that
    /// only appears in a path or query also matches.
    pub fn is_heavy(&self, tab: &TabRecord) -> bool {
        if tab.is_audible {
            return true;
        }

        match tab.url.as_deref() {
            Some(url) => self
                .config
                .heavy_sites
                .iter()
                .any(|site| !site.is_empty() && url.contains(site.as_str())),
            None => false,
        }
    }
}

/// A tab is inactive when it is not focused, has a recorded activation and
/// has been idle for strictly longer than `threshold`.
pub fn is_inactive(tab: &TabRecord, now: DateTime<Utc>, threshold: Duration) -> bool {
    if tab.is_active {
        return false;
    }

    match tab.last_active_at {
        Some(last) => now - last > threshold,
        None => false,
    }
}

/// Every tab sharing its exact URL with at least one other tab.
///
/// Groups are emitted contiguously in the order their first member appears;
/// members keep snapshot order within a group. URLs are compared verbatim.
pub fn find_duplicates(tabs: &[TabRecord]) -> Vec<TabRecord> {
    let mut groups: HashMap<&str, Vec<&TabRecord>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for tab in tabs {
        let Some(url) = tab.url.as_deref() else {
            continue;
        };

        let members = groups.entry(url).or_insert_with(|| {
            order.push(url);
            Vec::new()
        });
        members.push(tab);
    }

    order
        .into_iter()
        .filter_map(|url| groups.remove(url))
        .filter(|members| members.len() >= 2)
        .flatten()
        .cloned()
        .collect()
}
