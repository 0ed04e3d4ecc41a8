//! Dashboard snapshot for the presentation layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tabsense_tabs::{ClassificationResult, Classifier, HealthReport, TabRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_tabs: usize,
    pub classification: ClassificationResult,
    pub health: HealthReport,
    /// `None` until the first snapshot has been classified
    pub computed_at: Option<DateTime<Utc>>,
}

impl Dashboard {
    pub fn compute(tabs: &[TabRecord], classifier: &Classifier, now: DateTime<Utc>) -> Self {
        let classification = classifier.classify(tabs, now);
        let health = HealthReport::compute(tabs.len(), &classification);

        Self {
            total_tabs: tabs.len(),
            classification,
            health,
            computed_at: Some(now),
        }
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        let classification = ClassificationResult::default();
        let health = HealthReport::compute(0, &classification);

        Self {
            total_tabs: 0,
            classification,
            health,
            computed_at: None,
        }
    }
}
