//! Per-disease aggregate counts and the age bucket schemes they are keyed by.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::{Gender, NormalizedRecord, TagKind};

/// Label of the bucket that receives records without a usable age.
pub const UNKNOWN_BUCKET: &str = "unknown";

/// A closed age range, `max = None` meaning open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBucket {
    pub label: &'static str,
    pub min: u32,
    pub max: Option<u32>,
}

impl AgeBucket {
    const fn closed(label: &'static str, min: u32, max: u32) -> Self {
        Self {
            label,
            min,
            max: Some(max),
        }
    }

    const fn open(label: &'static str, min: u32) -> Self {
        Self {
            label,
            min,
            max: None,
        }
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && self.max.map_or(true, |max| age <= max)
    }
}

const COARSE_BUCKETS: &[AgeBucket] = &[
    AgeBucket::closed("0-5", 0, 5),
    AgeBucket::closed("6-12", 6, 12),
    AgeBucket::closed("13-18", 13, 18),
    AgeBucket::closed("19-30", 19, 30),
    AgeBucket::closed("31-45", 31, 45),
    AgeBucket::closed("46-60", 46, 60),
    AgeBucket::closed("61-75", 61, 75),
    AgeBucket::open("76+", 76),
];

// "65+" starts at 66 because "51-65" already owns 65.
const ANALYTICS_BUCKETS: &[AgeBucket] = &[
    AgeBucket::closed("0-18", 0, 18),
    AgeBucket::closed("19-35", 19, 35),
    AgeBucket::closed("36-50", 36, 50),
    AgeBucket::closed("51-65", 51, 65),
    AgeBucket::open("65+", 66),
];

/// Which set of age buckets an aggregation uses.
///
/// `Coarse` is the fine-grained pediatric-friendly scheme shown in the
/// dashboard; `Analytics` is the wider scheme used for trend reports. Both
/// end with an implicit [`UNKNOWN_BUCKET`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgeBucketScheme {
    #[default]
    Coarse,
    Analytics,
}

impl AgeBucketScheme {
    /// The known-age buckets in iteration order.
    pub fn buckets(&self) -> &'static [AgeBucket] {
        match self {
            AgeBucketScheme::Coarse => COARSE_BUCKETS,
            AgeBucketScheme::Analytics => ANALYTICS_BUCKETS,
        }
    }

    /// Every bucket label, `unknown` last.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> {
        self.buckets()
            .iter()
            .map(|b| b.label)
            .chain(std::iter::once(UNKNOWN_BUCKET))
    }

    /// Bucket label for an age, `unknown` when the age is missing.
    pub fn bucket_for(&self, age: Option<u32>) -> &'static str {
        age.and_then(|age| self.buckets().iter().find(|b| b.contains(age)))
            .map(|b| b.label)
            .unwrap_or(UNKNOWN_BUCKET)
    }

    /// Whether `label` names one of this scheme's buckets (including `unknown`).
    pub fn has_label(&self, label: &str) -> bool {
        self.labels().any(|l| l == label)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBucketScheme::Coarse => "coarse",
            AgeBucketScheme::Analytics => "analytics",
        }
    }
}

impl fmt::Display for AgeBucketScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count for a single age bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketCount {
    pub label: String,
    pub count: usize,
}

/// Case counts per gender.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenderCounts {
    pub male: usize,
    pub female: usize,
    pub unknown: usize,
}

impl GenderCounts {
    pub fn get(&self, gender: Gender) -> usize {
        match gender {
            Gender::Male => self.male,
            Gender::Female => self.female,
            Gender::Unknown => self.unknown,
        }
    }

    pub fn increment(&mut self, gender: Gender) {
        match gender {
            Gender::Male => self.male += 1,
            Gender::Female => self.female += 1,
            Gender::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.male + self.female + self.unknown
    }

    /// Male plus female; the denominator for dominance ratios.
    pub fn known_total(&self) -> usize {
        self.male + self.female
    }
}

/// Whether an aggregate's breakdowns are exact counts or carried over from a
/// cached aggregate by an aggregate-only re-slice.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    Exact,
    Resliced,
}

/// Accumulated statistics for one diagnosis label.
///
/// The bucket, gender and monthly counts each sum to `total_cases`. Only
/// `Precision::Exact` aggregates also guarantee
/// `unique_patients.len() <= total_cases`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiseaseAggregate {
    pub label: String,
    pub scheme: AgeBucketScheme,
    pub total_cases: usize,
    pub unique_patients: BTreeSet<String>,
    /// One entry per scheme bucket, in scheme order
    pub age_buckets: Vec<BucketCount>,
    pub gender_counts: GenderCounts,
    /// `YYYY-MM` → count
    pub monthly_counts: BTreeMap<String, usize>,
    /// Sum and count of known ages, kept so averages never come from buckets
    pub known_age_sum: u64,
    pub known_age_count: usize,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub symptom_counts: BTreeMap<String, usize>,
    pub medication_counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub precision: Precision,
}

impl DiseaseAggregate {
    /// Empty aggregate with every bucket of `scheme` present at zero.
    pub fn new(label: impl Into<String>, scheme: AgeBucketScheme) -> Self {
        Self {
            label: label.into(),
            scheme,
            total_cases: 0,
            unique_patients: BTreeSet::new(),
            age_buckets: scheme
                .labels()
                .map(|label| BucketCount {
                    label: label.to_string(),
                    count: 0,
                })
                .collect(),
            gender_counts: GenderCounts::default(),
            monthly_counts: BTreeMap::new(),
            known_age_sum: 0,
            known_age_count: 0,
            min_age: None,
            max_age: None,
            symptom_counts: BTreeMap::new(),
            medication_counts: BTreeMap::new(),
            precision: Precision::Exact,
        }
    }

    /// Fold one record into the counts.
    pub(crate) fn absorb(&mut self, record: &NormalizedRecord) {
        self.total_cases += 1;
        self.unique_patients.insert(record.patient_id.clone());

        let bucket = self.scheme.bucket_for(record.age);
        if let Some(entry) = self.age_buckets.iter_mut().find(|b| b.label == bucket) {
            entry.count += 1;
        }

        self.gender_counts.increment(record.gender);
        *self.monthly_counts.entry(record.visit_month()).or_insert(0) += 1;

        if let Some(age) = record.age {
            self.known_age_sum += u64::from(age);
            self.known_age_count += 1;
            self.min_age = Some(self.min_age.map_or(age, |m| m.min(age)));
            self.max_age = Some(self.max_age.map_or(age, |m| m.max(age)));
        }

        for tag in &record.tags {
            let counts = match tag.kind {
                TagKind::Symptom => &mut self.symptom_counts,
                TagKind::Medication => &mut self.medication_counts,
            };
            *counts.entry(tag.name.clone()).or_insert(0) += 1;
        }
    }

    /// Count in the named bucket (0 for labels outside the scheme).
    pub fn bucket_count(&self, label: &str) -> usize {
        self.age_buckets
            .iter()
            .find(|b| b.label == label)
            .map_or(0, |b| b.count)
    }

    pub fn unique_patient_count(&self) -> usize {
        self.unique_patients.len()
    }

    /// Check the conservation invariants.
    pub fn is_conserved(&self) -> bool {
        let bucket_sum: usize = self.age_buckets.iter().map(|b| b.count).sum();
        bucket_sum == self.total_cases
            && self.gender_counts.total() == self.total_cases
            && self.unique_patients.len() <= self.total_cases
    }
}
