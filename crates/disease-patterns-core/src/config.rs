//! Caller-supplied analysis configuration.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::{
    AgeGroupFilter, Branch, DateRange, DemographicFilter, GenderFilter, TemporalFilter,
    DEFAULT_TOP_AGE_BUCKETS, DEFAULT_TOP_N,
};
use crate::models::AgeBucketScheme;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Age group '{group}' is not a bucket of the {scheme} scheme")]
    UnknownAgeGroup {
        group: String,
        scheme: AgeBucketScheme,
    },

    #[error("Date range starts after it ends: {start} > {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("topN must be at least 1")]
    ZeroTopN,

    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Filter and presentation settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    pub date_range: Option<DateRange>,
    pub age_group: AgeGroupFilter,
    pub gender: GenderFilter,
    pub top_n: usize,
    pub bucket_scheme: AgeBucketScheme,
    /// Branch B: analyse only each patient's latest record
    pub latest_per_patient: bool,
    pub top_age_buckets: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            date_range: None,
            age_group: AgeGroupFilter::All,
            gender: GenderFilter::All,
            top_n: DEFAULT_TOP_N,
            bucket_scheme: AgeBucketScheme::default(),
            latest_per_patient: false,
            top_age_buckets: DEFAULT_TOP_AGE_BUCKETS,
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(range) = &self.date_range {
            range.validate()?;
        }
        self.age_group.validate(self.bucket_scheme)?;
        if self.top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }
        Ok(())
    }

    pub fn branch(&self) -> Branch {
        if self.latest_per_patient {
            Branch::LatestPerPatient
        } else {
            Branch::AllRecords
        }
    }

    pub fn temporal_filter(&self) -> TemporalFilter {
        TemporalFilter::new(self.date_range)
    }

    pub fn demographic_filter(&self) -> DemographicFilter {
        DemographicFilter::new(self.age_group.clone(), self.gender)
    }

    /// Human-readable description of the active filters.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(range) = &self.date_range {
            parts.push(format!("visits {}", range));
        }
        parts.extend(describe_demographics(&self.demographic_filter()));
        if self.latest_per_patient {
            parts.push("latest record per patient".to_string());
        }

        if parts.is_empty() {
            "all records".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Description parts for a demographic filter, empty when nothing is active.
pub fn describe_demographics(filter: &DemographicFilter) -> Vec<String> {
    let mut parts = Vec::new();
    if filter.age_group.is_active() {
        parts.push(format!("age group {}", filter.age_group));
    }
    if filter.gender.is_active() {
        parts.push(format!("gender {}", filter.gender));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = AnalysisConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.top_n, 10);
        assert_eq!(config.top_age_buckets, 3);
        assert_eq!(config.branch(), Branch::AllRecords);
        assert_eq!(config.describe(), "all records");
    }

    #[test]
    fn test_full_document() {
        let json = r#"{
            "dateRange": {"start": "2024-01-01", "end": "2024-03-31"},
            "ageGroup": "19-35",
            "gender": "female",
            "topN": 5,
            "bucketScheme": "analytics",
            "latestPerPatient": true
        }"#;
        let config = AnalysisConfig::from_json_str(json).unwrap();
        assert_eq!(config.age_group, AgeGroupFilter::Bucket("19-35".into()));
        assert_eq!(config.gender, GenderFilter::Female);
        assert_eq!(config.bucket_scheme, AgeBucketScheme::Analytics);
        assert_eq!(config.branch(), Branch::LatestPerPatient);
        assert_eq!(
            config.describe(),
            "visits 2024-01-01 to 2024-03-31; age group 19-35; gender female; latest record per patient"
        );
    }

    #[test]
    fn test_age_group_must_match_scheme() {
        let json = r#"{"ageGroup": "19-35", "bucketScheme": "coarse"}"#;
        let err = AnalysisConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAgeGroup { .. }));
    }

    #[test]
    fn test_invalid_values() {
        let json = r#"{"dateRange": {"start": "2024-05-01", "end": "2024-01-01"}}"#;
        assert!(matches!(
            AnalysisConfig::from_json_str(json),
            Err(ConfigError::InvertedDateRange { .. })
        ));
        assert!(matches!(
            AnalysisConfig::from_json_str(r#"{"topN": 0}"#),
            Err(ConfigError::ZeroTopN)
        ));
        assert!(matches!(
            AnalysisConfig::from_json_str(r#"{"gender": "other"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"gender": "male"}"#).unwrap();
        let config = AnalysisConfig::from_json_file(&path).unwrap();
        assert_eq!(config.gender, GenderFilter::Male);

        assert!(matches!(
            AnalysisConfig::from_json_file(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
