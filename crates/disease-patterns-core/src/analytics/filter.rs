//! Date-window and demographic filters.
//!
//! Two modes:
//! - Raw-record mode filters [`NormalizedRecord`]s before aggregation and is
//!   exact.
//! - Aggregate-only mode ([`DemographicFilter::reslice`]) re-derives counts
//!   from cached [`DiseaseAggregate`]s. Age filtering keeps only the selected
//!   bucket; gender filtering scales the case count by the selected gender's
//!   share. With both active the result assumes age and gender are
//!   independent within a disease, so it is flagged approximate.
//!
//! A re-sliced aggregate's age bucket, gender and monthly counts are
//! apportioned to its new case total, so they still sum to it. Everything
//! else is carried over from the unfiltered disease: the patient set, the
//! known-age sum and count (and so the average age), min and max age, and
//! the tag counts. Such aggregates are marked [`Precision::Resliced`].

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::models::{
    apportion, scale_rounded, AgeBucketScheme, DiseaseAggregate, Gender, NormalizedRecord, Precision,
};

/// Inclusive calendar-date window: `start` from 00:00:00.000 through `end`
/// at 23:59:59.999 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start > self.end {
            return Err(ConfigError::InvertedDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// First instant inside the window.
    pub fn start_instant(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.start.and_time(NaiveTime::MIN))
    }

    /// Last instant inside the window, at millisecond resolution.
    pub fn end_instant(&self) -> DateTime<Utc> {
        let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&self.end.and_time(end_of_day))
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start_instant() && *instant <= self.end_instant()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Restricts records to a visit-date window.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalFilter {
    range: Option<DateRange>,
}

impl TemporalFilter {
    pub fn new(range: Option<DateRange>) -> Self {
        Self { range }
    }

    pub fn range(&self) -> Option<DateRange> {
        self.range
    }

    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        self.range.map_or(true, |r| r.contains(&record.visit_date))
    }

    pub fn apply<'r, I>(&self, records: I) -> Vec<&'r NormalizedRecord>
    where
        I: IntoIterator<Item = &'r NormalizedRecord>,
    {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Age-group selection: every bucket, or one bucket label of the active
/// scheme. Serialized as the bucket label or `"all"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgeGroupFilter {
    #[default]
    All,
    Bucket(String),
}

impl AgeGroupFilter {
    pub fn is_active(&self) -> bool {
        matches!(self, AgeGroupFilter::Bucket(_))
    }

    pub fn bucket(&self) -> Option<&str> {
        match self {
            AgeGroupFilter::All => None,
            AgeGroupFilter::Bucket(label) => Some(label),
        }
    }

    pub fn matches(&self, scheme: AgeBucketScheme, age: Option<u32>) -> bool {
        self.bucket().map_or(true, |label| scheme.bucket_for(age) == label)
    }

    /// Fails when the selected label is not a bucket of `scheme`.
    pub fn validate(&self, scheme: AgeBucketScheme) -> Result<(), ConfigError> {
        match self.bucket() {
            Some(label) if !scheme.has_label(label) => Err(ConfigError::UnknownAgeGroup {
                group: label.to_string(),
                scheme,
            }),
            _ => Ok(()),
        }
    }
}

impl From<String> for AgeGroupFilter {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            AgeGroupFilter::All
        } else {
            AgeGroupFilter::Bucket(trimmed.to_string())
        }
    }
}

impl From<AgeGroupFilter> for String {
    fn from(value: AgeGroupFilter) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AgeGroupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeGroupFilter::All => f.write_str("all"),
            AgeGroupFilter::Bucket(label) => f.write_str(label),
        }
    }
}

/// Gender selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderFilter {
    #[default]
    All,
    Male,
    Female,
    Unknown,
}

impl GenderFilter {
    pub fn is_active(&self) -> bool {
        !matches!(self, GenderFilter::All)
    }

    pub fn selected(&self) -> Option<Gender> {
        match self {
            GenderFilter::All => None,
            GenderFilter::Male => Some(Gender::Male),
            GenderFilter::Female => Some(Gender::Female),
            GenderFilter::Unknown => Some(Gender::Unknown),
        }
    }

    pub fn matches(&self, gender: Gender) -> bool {
        self.selected().map_or(true, |g| g == gender)
    }

    /// Parse `all`/`male`/`female`/`unknown` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "all" => Some(GenderFilter::All),
            "male" => Some(GenderFilter::Male),
            "female" => Some(GenderFilter::Female),
            "unknown" => Some(GenderFilter::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenderFilter::All => "all",
            GenderFilter::Male => "male",
            GenderFilter::Female => "female",
            GenderFilter::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GenderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an aggregate-only re-slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Reslice {
    /// Surviving aggregates, all marked [`Precision::Resliced`]
    pub aggregates: Vec<DiseaseAggregate>,
    /// Both age and gender filters were applied
    pub approximate: bool,
}

/// Age-group and gender restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicFilter {
    #[serde(default)]
    pub age_group: AgeGroupFilter,
    #[serde(default)]
    pub gender: GenderFilter,
}

impl DemographicFilter {
    pub fn new(age_group: AgeGroupFilter, gender: GenderFilter) -> Self {
        Self { age_group, gender }
    }

    pub fn is_active(&self) -> bool {
        self.age_group.is_active() || self.gender.is_active()
    }

    /// Both dimensions restricted at once.
    pub fn is_combined(&self) -> bool {
        self.age_group.is_active() && self.gender.is_active()
    }

    pub fn matches(&self, scheme: AgeBucketScheme, record: &NormalizedRecord) -> bool {
        self.age_group.matches(scheme, record.age) && self.gender.matches(record.gender)
    }

    /// Raw-record mode.
    pub fn apply_records<'r, I>(&self, scheme: AgeBucketScheme, records: I) -> Vec<&'r NormalizedRecord>
    where
        I: IntoIterator<Item = &'r NormalizedRecord>,
    {
        records
            .into_iter()
            .filter(|r| self.matches(scheme, r))
            .collect()
    }

    /// Aggregate-only mode. Diseases whose filtered count reaches zero are
    /// dropped; the caller re-ranks what remains.
    pub fn reslice(&self, aggregates: &[DiseaseAggregate]) -> Reslice {
        let approximate = self.is_combined();
        if approximate {
            tracing::warn!(
                age_group = %self.age_group,
                gender = %self.gender,
                "combined age and gender re-slice of cached aggregates is approximate"
            );
        }

        let aggregates = aggregates
            .iter()
            .map(|aggregate| self.reslice_one(aggregate))
            .filter(|aggregate| aggregate.total_cases > 0)
            .collect();

        Reslice {
            aggregates,
            approximate,
        }
    }

    fn reslice_one(&self, source: &DiseaseAggregate) -> DiseaseAggregate {
        let mut aggregate = source.clone();
        aggregate.precision = Precision::Resliced;

        if let Some(label) = self.age_group.bucket() {
            for bucket in &mut aggregate.age_buckets {
                if bucket.label != label {
                    bucket.count = 0;
                }
            }
            aggregate.total_cases = aggregate.bucket_count(label);
        }

        if let Some(gender) = self.gender.selected() {
            let counts = source.gender_counts;
            let denominator = match gender {
                Gender::Unknown => counts.total(),
                Gender::Male | Gender::Female => counts.known_total(),
            };
            aggregate.total_cases =
                scale_rounded(aggregate.total_cases, counts.get(gender), denominator);

            aggregate.gender_counts = Default::default();
            match gender {
                Gender::Male => aggregate.gender_counts.male = aggregate.total_cases,
                Gender::Female => aggregate.gender_counts.female = aggregate.total_cases,
                Gender::Unknown => aggregate.gender_counts.unknown = aggregate.total_cases,
            }
        } else {
            let counts = source.gender_counts;
            let shares = apportion(&[counts.male, counts.female, counts.unknown], aggregate.total_cases);
            aggregate.gender_counts.male = shares[0];
            aggregate.gender_counts.female = shares[1];
            aggregate.gender_counts.unknown = shares[2];
        }

        let total = aggregate.total_cases;
        let buckets: Vec<usize> = aggregate.age_buckets.iter().map(|b| b.count).collect();
        for (bucket, share) in aggregate.age_buckets.iter_mut().zip(apportion(&buckets, total)) {
            bucket.count = share;
        }

        let months: Vec<usize> = source.monthly_counts.values().copied().collect();
        aggregate.monthly_counts = source
            .monthly_counts
            .keys()
            .cloned()
            .zip(apportion(&months, total))
            .filter(|(_, count)| *count > 0)
            .collect();

        aggregate
    }
}
