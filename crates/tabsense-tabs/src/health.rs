//! Tab health score

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classifier::ClassificationResult;

/// Open tabs allowed before the count starts costing points
const FREE_TAB_COUNT: usize = 10;
const TAB_PENALTY: u32 = 2;
const DUPLICATE_PENALTY: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthRank {
    ZenMaster,
    BrowserBoss,
    TabHoarder,
}

impl HealthRank {
    pub fn for_score(score: u32) -> Self {
        if score < 50 {
            HealthRank::TabHoarder
        } else if score < 80 {
            HealthRank::BrowserBoss
        } else {
            HealthRank::ZenMaster
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthRank::ZenMaster => "Zen Master",
            HealthRank::BrowserBoss => "Browser Boss",
            HealthRank::TabHoarder => "Tab Hoarder",
        }
    }
}

impl fmt::Display for HealthRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// 0..=100, higher is tidier
    pub score: u32,
    pub rank: HealthRank,
    /// Human-readable reasons for each deduction
    pub penalties: Vec<String>,
}

impl HealthReport {
    pub fn compute(total_tabs: usize, classification: &ClassificationResult) -> Self {
        let mut deduction: u32 = 0;
        let mut penalties = Vec::new();

        if total_tabs > FREE_TAB_COUNT {
            let p = (total_tabs - FREE_TAB_COUNT) as u32 * TAB_PENALTY;
            deduction = deduction.saturating_add(p);
            penalties.push(format!("-{} for {} open tabs", p, total_tabs));
        }

        let duplicates = classification.duplicate.len();
        if duplicates > 0 {
            let p = duplicates as u32 * DUPLICATE_PENALTY;
            deduction = deduction.saturating_add(p);
            penalties.push(format!("-{} for {} duplicate tabs", p, duplicates));
        }

        let score = 100u32.saturating_sub(deduction);

        Self {
            score,
            rank: HealthRank::for_score(score),
            penalties,
        }
    }
}
