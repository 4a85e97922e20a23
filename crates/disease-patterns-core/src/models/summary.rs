//! Derived per-disease statistics.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::aggregate::BucketCount;

/// Gender with the larger share of gender-known cases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DominantGender {
    Male,
    Female,
    /// Male and female counts are equal and non-zero
    Equal,
    /// No case had a known gender
    #[serde(rename = "No Data")]
    NoData,
}

impl fmt::Display for DominantGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DominantGender::Male => "Male",
            DominantGender::Female => "Female",
            DominantGender::Equal => "Equal",
            DominantGender::NoData => "No Data",
        })
    }
}

/// Direction of the latest month against the month before it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    #[default]
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        })
    }
}

/// A tag with its occurrence count inside one disease.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Secondary statistics derived from a single [`super::DiseaseAggregate`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiseaseSummary {
    pub label: String,
    pub total_cases: usize,
    pub unique_patients: usize,
    /// Share of the batch's total cases, rounded to a whole percent
    pub percentage: u32,
    /// Same share without rounding
    pub percentage_exact: f64,
    /// Mean over known ages, 0 when none is known
    pub average_age: f64,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub dominant_gender: DominantGender,
    pub dominant_gender_percentage: u32,
    pub dominant_age_bucket: String,
    pub top_age_buckets: Vec<BucketCount>,
    pub top_symptoms: Vec<TagCount>,
    pub top_medications: Vec<TagCount>,
    pub peak_month: Option<String>,
    pub trend: Trend,
}

impl DiseaseSummary {
    /// `min_age`/`max_age` rendered for display ("unknown" when absent).
    pub fn age_range_display(&self) -> String {
        match (self.min_age, self.max_age) {
            (Some(min), Some(max)) => format!("{}-{}", min, max),
            _ => "unknown".to_string(),
        }
    }
}

/// `part / whole` as a percentage, computed in floating point from the exact
/// integers. Returns 0 for an empty whole.
pub fn exact_percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

/// `part / whole` as a whole percent, rounded half up with integer arithmetic
/// so no rounded intermediate is ever reused.
pub fn rounded_percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (part as u128, whole as u128);
    ((part * 200 + whole) / (whole * 2)) as u32
}

/// `value * numerator / denominator`, rounded half up. Returns 0 when the
/// denominator is 0.
pub fn scale_rounded(value: usize, numerator: usize, denominator: usize) -> usize {
    if denominator == 0 {
        return 0;
    }
    let (v, n, d) = (value as u128, numerator as u128, denominator as u128);
    ((v * n * 2 + d) / (d * 2)) as usize
}

/// Split `total` across `counts` in proportion to them, largest remainder
/// first (earliest index on ties). The result sums to `total` whenever any
/// count is non-zero.
pub fn apportion(counts: &[usize], total: usize) -> Vec<usize> {
    let whole: u128 = counts.iter().map(|&c| c as u128).sum();
    if whole == 0 {
        return vec![0; counts.len()];
    }
    let total = total as u128;
    let mut shares: Vec<usize> = counts
        .iter()
        .map(|&c| (c as u128 * total / whole) as usize)
        .collect();

    let assigned: usize = shares.iter().sum();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(counts[i] as u128 * total % whole));
    for &i in order.iter().take(total as usize - assigned) {
        shares[i] += 1;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_percentage_thirds() {
        assert_eq!(rounded_percentage(30, 60), 50);
        assert_eq!(rounded_percentage(20, 60), 33);
        assert_eq!(rounded_percentage(10, 60), 17);
        assert_eq!(rounded_percentage(1, 8), 13); // 12.5 rounds up
        assert_eq!(rounded_percentage(5, 0), 0);
    }

    #[test]
    fn test_scale_rounded() {
        assert_eq!(scale_rounded(10, 1, 3), 3);
        assert_eq!(scale_rounded(10, 2, 3), 7);
        assert_eq!(scale_rounded(5, 1, 2), 3);
        assert_eq!(scale_rounded(5, 1, 0), 0);
    }

    #[test]
    fn test_dominant_gender_serialization() {
        let json = serde_json::to_string(&DominantGender::NoData).unwrap();
        assert_eq!(json, "\"No Data\"");
        assert_eq!(DominantGender::Equal.to_string(), "Equal");
    }

    #[test]
    fn test_apportion_keeps_the_total() {
        assert_eq!(apportion(&[5, 5, 0], 3), vec![2, 1, 0]);
        assert_eq!(apportion(&[1, 1, 1], 2), vec![1, 1, 0]);
        assert_eq!(apportion(&[6, 3, 1], 5), vec![3, 2, 0]);
        assert_eq!(apportion(&[4, 0], 4), vec![4, 0]);
        assert_eq!(apportion(&[0, 0], 3), vec![0, 0]);
        assert!(apportion(&[], 0).is_empty());
    }
}
