//! Medical record models: the raw shape fetched from the clinic API and the
//! canonical shape the analytics pipeline works on.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// A medical record exactly as supplied by the records collaborator.
///
/// Every field except `patient_id` is optional; the normalizer decides what
/// is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawMedicalRecord {
    /// Patient identifier (the API sends either a string or a number)
    #[serde(deserialize_with = "deserialize_id")]
    pub patient_id: String,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub chief_complaint: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub history_of_present_illness: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub assessment: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub plan: Option<String>,
    /// Creation time, authoritative when present
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub date_recorded: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub visit_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub date_created: Option<String>,
    /// Explicit age recorded at the visit, wins over the birth-date derivation
    #[serde(default, deserialize_with = "deserialize_lenient_age")]
    pub age: Option<i64>,
    /// Explicit gender recorded at the visit, wins over the patient record
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub gender: Option<String>,
}

impl RawMedicalRecord {
    /// Create a record for a patient with no content.
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            ..Self::default()
        }
    }

    /// All free-text fields concatenated, used for tag extraction.
    pub fn free_text(&self) -> String {
        [
            &self.chief_complaint,
            &self.history_of_present_illness,
            &self.assessment,
            &self.plan,
        ]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// Normalized patient gender.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// Parse a free-form gender value. Only `m`/`male` and `f`/`female`
    /// (any case) are recognised.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "m" | "male" => Gender::Male,
            "f" | "female" => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Gender::Unknown)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cleaned record with a resolved diagnosis label and visit date.
///
/// Constructed only by the normalizer; a value of this type always has a
/// non-empty label and a valid visit timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedRecord {
    pub patient_id: String,
    pub diagnosis_label: String,
    pub visit_date: DateTime<Utc>,
    /// Age in whole years, `None` when unresolved or out of range
    pub age: Option<u32>,
    pub gender: Gender,
    /// Extracted symptom/medication tags
    pub tags: BTreeSet<MedicalTag>,
}

impl NormalizedRecord {
    /// Calendar month of the visit as `YYYY-MM`.
    pub fn visit_month(&self) -> String {
        self.visit_date.format("%Y-%m").to_string()
    }

    /// Whether a tag with this name was extracted.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }
}

/// Category of an extracted keyword.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Symptom,
    Medication,
}

/// A keyword token extracted from the free text of a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MedicalTag {
    pub kind: TagKind,
    pub name: String,
}

impl MedicalTag {
    pub fn symptom(name: impl Into<String>) -> Self {
        Self {
            kind: TagKind::Symptom,
            name: name.into(),
        }
    }

    pub fn medication(name: impl Into<String>) -> Self {
        Self {
            kind: TagKind::Medication,
            name: name.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Int(i64),
    Uint(u64),
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(s) => s.trim().to_string(),
        IdRepr::Int(n) => n.to_string(),
        IdRepr::Uint(n) => n.to_string(),
    })
}

/// Text or a number; booleans, objects, arrays and null fall into `Other`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseScalar {
    Text(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Other(#[allow(dead_code)] IgnoredAny),
}

/// Optional text that never fails the enclosing element: numbers become
/// their decimal text, blanks and non-scalars become `None`.
pub(crate) fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LooseScalar::deserialize(deserializer)? {
        LooseScalar::Text(s) if !s.trim().is_empty() => Some(s),
        LooseScalar::Int(n) => Some(n.to_string()),
        LooseScalar::Uint(n) => Some(n.to_string()),
        LooseScalar::Float(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Optional age from a number or numeric text; anything else is `None`.
pub(crate) fn deserialize_lenient_age<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LooseScalar::deserialize(deserializer)? {
        LooseScalar::Int(n) => Some(n),
        LooseScalar::Uint(n) => i64::try_from(n).ok(),
        LooseScalar::Float(n) if n.is_finite() => Some(n.trunc() as i64),
        LooseScalar::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
        }
        _ => None,
    })
}
