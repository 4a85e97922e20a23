//! Patient models.

use serde::{Deserialize, Serialize};

use super::record::{deserialize_id, deserialize_lenient_text};

/// A patient record as supplied by the patients collaborator.
///
/// Different clinic API versions spell birth date and gender differently, so
/// every known spelling is captured; the normalizer probes them in a fixed
/// order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawPatient {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub birth_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub birthdate: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub dob: Option<String>,
    #[serde(rename = "birthDate", default, deserialize_with = "deserialize_lenient_text")]
    pub birth_date_camel: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub sex: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub sex_gender: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub middle_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub last_name: Option<String>,
    /// Used by pediatric records instead of the split name fields
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub child_name: Option<String>,
}

impl RawPatient {
    /// Create a patient with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the birth date (builder style, mostly for tests and fixtures).
    pub fn with_birth_date(mut self, birth_date: impl Into<String>) -> Self {
        self.birth_date = Some(birth_date.into());
        self
    }

    /// Set the sex field (builder style).
    pub fn with_sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = Some(sex.into());
        self
    }

    /// Human-readable name: first/middle/last joined, else the child name,
    /// else the identifier.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [&self.first_name, &self.middle_name, &self.last_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        if !parts.is_empty() {
            return parts.join(" ");
        }

        self.child_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let mut patient = RawPatient::new("p1");
        assert_eq!(patient.display_name(), "p1");

        patient.child_name = Some("Baby Reyes".into());
        assert_eq!(patient.display_name(), "Baby Reyes");

        patient.first_name = Some("Ana".into());
        patient.middle_name = Some(" ".into());
        patient.last_name = Some("Reyes".into());
        assert_eq!(patient.display_name(), "Ana Reyes");
    }

    #[test]
    fn test_camel_case_birth_date() {
        let patient: RawPatient =
            serde_json::from_str(r#"{"id": 7, "birthDate": "1990-04-01", "sex_gender": "F"}"#)
                .unwrap();
        assert_eq!(patient.id, "7");
        assert_eq!(patient.birth_date_camel.as_deref(), Some("1990-04-01"));
        assert_eq!(patient.sex_gender.as_deref(), Some("F"));
    }
}
