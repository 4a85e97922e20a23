//! Ordered field probes for timestamps, birth dates and gender.
//!
//! Clinic API versions disagree on field names, so each value is resolved by
//! walking a fixed list of named accessors and keeping the first one that
//! yields a parseable value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::models::{Gender, RawMedicalRecord, RawPatient};

/// Oldest age still considered plausible.
pub const MAX_PLAUSIBLE_AGE: u32 = 120;

/// Milliseconds in the 365.25-day year used for age computation.
const MILLIS_PER_YEAR_X100: i64 = 36_525 * 86_400_000;

/// A named way of reading an optional string field from `T`.
pub struct FieldAccessor<T> {
    pub name: &'static str,
    pub get: fn(&T) -> Option<&str>,
}

macro_rules! accessor {
    ($ty:ty, $field:ident) => {
        accessor!($ty, $field, stringify!($field))
    };
    ($ty:ty, $field:ident, $name:expr) => {
        FieldAccessor {
            name: $name,
            get: {
                fn get(value: &$ty) -> Option<&str> {
                    value.$field.as_deref()
                }
                get
            },
        }
    };
}

/// Visit timestamp fields, creation time first.
pub const VISIT_DATE_FIELDS: &[FieldAccessor<RawMedicalRecord>] = &[
    accessor!(RawMedicalRecord, created_at),
    accessor!(RawMedicalRecord, date_recorded),
    accessor!(RawMedicalRecord, visit_date),
    accessor!(RawMedicalRecord, date_created),
];

/// Birth date fields on the patient record.
pub const BIRTH_DATE_FIELDS: &[FieldAccessor<RawPatient>] = &[
    accessor!(RawPatient, birth_date),
    accessor!(RawPatient, date_of_birth),
    accessor!(RawPatient, birthdate),
    accessor!(RawPatient, dob),
    accessor!(RawPatient, birth_date_camel, "birthDate"),
];

/// Gender fields on the patient record.
pub const GENDER_FIELDS: &[FieldAccessor<RawPatient>] = &[
    accessor!(RawPatient, sex),
    accessor!(RawPatient, gender),
    accessor!(RawPatient, sex_gender),
];

/// Walk `fields` in order and return the first value `parse` accepts, with
/// the name of the field it came from.
pub fn first_parsed<T, V>(
    item: &T,
    fields: &[FieldAccessor<T>],
    parse: impl Fn(&str) -> Option<V>,
) -> Option<(&'static str, V)> {
    fields.iter().find_map(|field| {
        (field.get)(item)
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .and_then(&parse)
            .map(|value| (field.name, value))
    })
}

/// Parse a timestamp in any of the shapes the clinic API emits.
///
/// Offsets are converted to UTC; naive timestamps and bare dates are taken
/// as UTC (bare dates at midnight).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse a birth date; any timestamp shape is accepted and truncated to its date.
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|dt| dt.date_naive())
}

/// Whole years between `birth` and `now` using 365.25-day years.
///
/// Returns `None` for birth dates in the future or ages above
/// [`MAX_PLAUSIBLE_AGE`].
pub fn age_in_years(birth: NaiveDate, now: DateTime<Utc>) -> Option<u32> {
    let birth = Utc.from_utc_datetime(&birth.and_hms_opt(0, 0, 0)?);
    let elapsed_ms = (now - birth).num_milliseconds();
    if elapsed_ms < 0 {
        return None;
    }

    let years = elapsed_ms.checked_mul(100)? / MILLIS_PER_YEAR_X100;
    u32::try_from(years)
        .ok()
        .filter(|age| *age <= MAX_PLAUSIBLE_AGE)
}

/// Validate an explicitly recorded age.
pub fn plausible_age(age: i64) -> Option<u32> {
    u32::try_from(age).ok().filter(|age| *age <= MAX_PLAUSIBLE_AGE)
}

/// Parse a gender value, succeeding only for recognised male/female spellings.
pub fn parse_known_gender(raw: &str) -> Option<Gender> {
    Some(Gender::parse(raw)).filter(Gender::is_known)
}

/// Visit timestamp of a record, or `None` if no field parses.
pub fn resolve_visit_date(record: &RawMedicalRecord) -> Option<DateTime<Utc>> {
    first_parsed(record, VISIT_DATE_FIELDS, parse_timestamp).map(|(_, dt)| dt)
}

/// Age of a patient at `now` from the first parseable birth date field.
pub fn resolve_patient_age(patient: &RawPatient, now: DateTime<Utc>) -> Option<u32> {
    first_parsed(patient, BIRTH_DATE_FIELDS, parse_birth_date)
        .and_then(|(_, birth)| age_in_years(birth, now))
}

/// Gender of a patient from the first recognisable gender field.
pub fn resolve_patient_gender(patient: &RawPatient) -> Gender {
    first_parsed(patient, GENDER_FIELDS, parse_known_gender)
        .map(|(_, gender)| gender)
        .unwrap_or(Gender::Unknown)
}
