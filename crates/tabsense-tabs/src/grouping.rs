//! Domain grouping
//!
//! One-shot tidy-up: tabs of the current window that share an exact
//! hostname are gathered into a visual group titled with that hostname.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::source::{TabFilter, TabSource};
use crate::tab::{GroupId, TabId, TabRecord};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainGroup {
    pub hostname: String,
    pub group_id: GroupId,
    pub tab_ids: Vec<TabId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingReport {
    pub grouped: Vec<DomainGroup>,
    /// Hostnames whose group request failed
    pub failed: Vec<String>,
}

/// Bucket tabs by exact hostname, in first-seen order.
///
/// Pinned tabs and tabs without a parseable host are skipped.
pub fn bucket_by_hostname(tabs: &[TabRecord]) -> Vec<(String, Vec<TabId>)> {
    let mut buckets: Vec<(String, Vec<TabId>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for tab in tabs.iter().filter(|tab| !tab.is_pinned) {
        let Some(host) = tab.hostname() else {
            continue;
        };

        match index.get(&host) {
            Some(&i) => buckets[i].1.push(tab.id),
            None => {
                index.insert(host.clone(), buckets.len());
                buckets.push((host, vec![tab.id]));
            }
        }
    }

    buckets
}

/// Group the current window's tabs by hostname.
///
/// Only a failed snapshot read is returned as an error; each bucket is
/// grouped independently and a failure leaves the other groups in place.
pub async fn group_by_domain(source: &dyn TabSource) -> Result<GroupingReport> {
    let tabs = source.list_tabs(TabFilter::current_window()).await?;

    let requests = bucket_by_hostname(&tabs)
        .into_iter()
        .filter(|(_, ids)| ids.len() >= 2)
        .map(|(hostname, tab_ids)| async move {
            let outcome = async {
                let group_id = source.group_tabs(tab_ids.clone()).await?;
                source.set_group_title(group_id, hostname.clone()).await?;
                Ok::<_, crate::TabError>(group_id)
            }
            .await;
            (hostname, tab_ids, outcome)
        });

    let mut report = GroupingReport::default();
    for (hostname, tab_ids, outcome) in join_all(requests).await {
        match outcome {
            Ok(group_id) => {
                tracing::info!(
                    hostname = %hostname,
                    group_id = %group_id,
                    tab_count = tab_ids.len(),
                    "Grouped tabs by domain"
                );
                report.grouped.push(DomainGroup {
                    hostname,
                    group_id,
                    tab_ids,
                });
            }
            Err(e) => {
                tracing::warn!(hostname = %hostname, error = %e, "Failed to group tabs");
                report.failed.push(hostname);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTabSource;
    use crate::tab::WindowId;

    fn tab(id: i64, window: i64, url: &str) -> TabRecord {
        TabRecord::new(TabId(id), WindowId(window), Some(url.to_string()))
    }

    #[test]
    fn test_buckets_use_exact_hostnames() {
        let tabs = vec![
            tab(1, 1, "https://github.com/a"),
            tab(2, 1, "https://gist.github.com/b"),
            tab(3, 1, "https://github.com/c"),
            tab(4, 1, "https://github.com/d").pinned(),
            TabRecord::new(TabId(5), WindowId(1), None),
            tab(6, 1, "not a url"),
        ];

        let buckets = bucket_by_hostname(&tabs);
        assert_eq!(
            buckets,
            vec![
                ("github.com".to_string(), vec![TabId(1), TabId(3)]),
                ("gist.github.com".to_string(), vec![TabId(2)]),
            ]
        );
    }

    #[tokio::test]
    async fn test_group_by_domain() {
        let source = MemoryTabSource::with_tabs(
            WindowId(1),
            [
                tab(1, 1, "https://a.com/1"),
                tab(2, 1, "https://b.com/1"),
                tab(3, 1, "https://a.com/2"),
                // Other window is left alone
                tab(4, 2, "https://b.com/2"),
            ],
        );

        let report = group_by_domain(&source).await.unwrap();
        assert_eq!(report.grouped.len(), 1);
        assert_eq!(report.grouped[0].hostname, "a.com");
        assert_eq!(report.grouped[0].tab_ids, vec![TabId(1), TabId(3)]);
        assert!(report.failed.is_empty());

        let groups = source.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title.as_deref(), Some("a.com"));
    }

    #[tokio::test]
    async fn test_group_failure_does_not_block_other_buckets() {
        let source = MemoryTabSource::with_tabs(
            WindowId(1),
            [
                tab(1, 1, "https://a.com/1"),
                tab(2, 1, "https://a.com/2"),
                tab(3, 1, "https://b.com/1"),
                tab(4, 1, "https://b.com/2"),
            ],
        );
        source.fail_requests_for(TabId(2));

        let report = group_by_domain(&source).await.unwrap();
        assert_eq!(report.failed, vec!["a.com".to_string()]);
        assert_eq!(report.grouped.len(), 1);
        assert_eq!(report.grouped[0].hostname, "b.com");
    }
}
