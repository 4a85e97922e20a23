//! Ordering and truncation of per-disease results.

use serde::{Deserialize, Serialize};

use crate::models::{DiseaseAggregate, DiseaseSummary};

/// Default number of rows kept by the ranker.
pub const DEFAULT_TOP_N: usize = 10;

/// A disease's aggregate paired with its derived summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DiseaseStats {
    pub aggregate: DiseaseAggregate,
    pub summary: DiseaseSummary,
}

impl DiseaseStats {
    pub fn label(&self) -> &str {
        &self.aggregate.label
    }

    pub fn total_cases(&self) -> usize {
        self.aggregate.total_cases
    }
}

/// One output row, `rank` starting at 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedDisease {
    pub rank: usize,
    pub summary: DiseaseSummary,
}

impl RankedDisease {
    pub fn label(&self) -> &str {
        &self.summary.label
    }
}

/// Sorts by case count descending, then label ascending, and keeps the top N.
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    top_n: usize,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

impl Ranker {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn rank(&self, mut stats: Vec<DiseaseStats>) -> Vec<RankedDisease> {
        stats.sort_by(|a, b| {
            b.total_cases()
                .cmp(&a.total_cases())
                .then_with(|| a.label().cmp(b.label()))
        });

        stats
            .into_iter()
            .take(self.top_n)
            .enumerate()
            .map(|(index, s)| RankedDisease {
                rank: index + 1,
                summary: s.summary,
            })
            .collect()
    }
}
