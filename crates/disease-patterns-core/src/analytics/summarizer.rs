//! Secondary per-disease statistics derived purely from aggregate counts.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{
    exact_percentage, rounded_percentage, BucketCount, DiseaseAggregate, DiseaseSummary,
    DominantGender, TagCount, Trend,
};

/// Default number of age buckets listed per disease.
pub const DEFAULT_TOP_AGE_BUCKETS: usize = 3;

/// Number of symptom and medication tags listed per disease.
pub const DEFAULT_TOP_TAGS: usize = 3;

/// Derives [`DiseaseSummary`] values. Never looks at raw records.
#[derive(Debug, Clone, Copy)]
pub struct DemographicSummarizer {
    top_age_buckets: usize,
    top_tags: usize,
}

impl Default for DemographicSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_AGE_BUCKETS)
    }
}

impl DemographicSummarizer {
    pub fn new(top_age_buckets: usize) -> Self {
        Self {
            top_age_buckets,
            top_tags: DEFAULT_TOP_TAGS,
        }
    }

    /// Summarize one aggregate. `batch_total` is the sum of `total_cases`
    /// over every disease in the batch.
    pub fn summarize(&self, aggregate: &DiseaseAggregate, batch_total: usize) -> DiseaseSummary {
        let (dominant_gender, dominant_gender_percentage) = dominant_gender(aggregate);

        DiseaseSummary {
            label: aggregate.label.clone(),
            total_cases: aggregate.total_cases,
            // A re-sliced aggregate keeps its cached patient set
            unique_patients: aggregate.unique_patient_count().min(aggregate.total_cases),
            percentage: rounded_percentage(aggregate.total_cases, batch_total),
            percentage_exact: exact_percentage(aggregate.total_cases, batch_total),
            average_age: average_age(aggregate),
            min_age: aggregate.min_age,
            max_age: aggregate.max_age,
            dominant_gender,
            dominant_gender_percentage,
            dominant_age_bucket: dominant_age_bucket(aggregate),
            top_age_buckets: top_age_buckets(aggregate, self.top_age_buckets),
            top_symptoms: top_tags(&aggregate.symptom_counts, self.top_tags),
            top_medications: top_tags(&aggregate.medication_counts, self.top_tags),
            peak_month: peak_month(&aggregate.monthly_counts),
            trend: trend(&aggregate.monthly_counts),
        }
    }

    /// Summarize a whole batch, using its own total as the denominator.
    pub fn summarize_all(&self, aggregates: &[DiseaseAggregate]) -> Vec<DiseaseSummary> {
        let batch_total = super::total_cases(aggregates);
        aggregates
            .iter()
            .map(|aggregate| self.summarize(aggregate, batch_total))
            .collect()
    }
}

/// Mean over records with a known age; 0 when there are none.
fn average_age(aggregate: &DiseaseAggregate) -> f64 {
    if aggregate.known_age_count == 0 {
        return 0.0;
    }
    aggregate.known_age_sum as f64 / aggregate.known_age_count as f64
}

/// Male vs female only; unknown-gender cases take no part in the comparison.
fn dominant_gender(aggregate: &DiseaseAggregate) -> (DominantGender, u32) {
    let counts = aggregate.gender_counts;
    let known = counts.known_total();

    match counts.male.cmp(&counts.female) {
        _ if known == 0 => (DominantGender::NoData, 0),
        Ordering::Greater => (DominantGender::Male, rounded_percentage(counts.male, known)),
        Ordering::Less => (DominantGender::Female, rounded_percentage(counts.female, known)),
        Ordering::Equal => (DominantGender::Equal, 50),
    }
}

/// Most populated bucket including `unknown`; ties go to the earlier bucket.
fn dominant_age_bucket(aggregate: &DiseaseAggregate) -> String {
    let mut best: Option<&BucketCount> = None;
    for bucket in &aggregate.age_buckets {
        if best.map_or(true, |b| bucket.count > b.count) {
            best = Some(bucket);
        }
    }
    best.map(|b| b.label.clone()).unwrap_or_default()
}

/// Non-empty buckets, count descending then label ascending.
fn top_age_buckets(aggregate: &DiseaseAggregate, limit: usize) -> Vec<BucketCount> {
    let mut buckets: Vec<BucketCount> = aggregate
        .age_buckets
        .iter()
        .filter(|b| b.count > 0)
        .cloned()
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    buckets.truncate(limit);
    buckets
}

fn top_tags(counts: &BTreeMap<String, usize>, limit: usize) -> Vec<TagCount> {
    let mut tags: Vec<TagCount> = counts
        .iter()
        .map(|(tag, count)| TagCount {
            tag: tag.clone(),
            count: *count,
        })
        .collect();
    tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    tags.truncate(limit);
    tags
}

/// Month with the most cases; the earliest wins a tie.
fn peak_month(monthly: &BTreeMap<String, usize>) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for (month, &count) in monthly {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((month, count));
        }
    }
    best.map(|(month, _)| month.clone())
}

/// Latest month with data against the calendar month right before it.
fn trend(monthly: &BTreeMap<String, usize>) -> Trend {
    if monthly.len() < 2 {
        return Trend::Stable;
    }
    let Some((latest_month, &latest)) = monthly.iter().next_back() else {
        return Trend::Stable;
    };
    let previous = previous_month(latest_month)
        .and_then(|month| monthly.get(&month).copied())
        .unwrap_or(0);

    match latest.cmp(&previous) {
        Ordering::Greater => Trend::Rising,
        Ordering::Less => Trend::Falling,
        Ordering::Equal => Trend::Stable,
    }
}

/// `YYYY-MM` of the month before `month`.
fn previous_month(month: &str) -> Option<String> {
    let (year, month) = month.split_once('-')?;
    let (year, month): (i32, u32) = (year.parse().ok()?, month.parse().ok()?);
    let (year, month) = if month <= 1 { (year - 1, 12) } else { (year, month - 1) };
    Some(format!("{:04}-{:02}", year, month))
}
