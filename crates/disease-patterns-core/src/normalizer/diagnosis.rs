//! Diagnosis label resolution from free-text note fields.

use crate::models::RawMedicalRecord;

/// Label used when no note field carries usable text. Records ending up with
/// it are excluded from analytics.
pub const FALLBACK_LABEL: &str = "General Medical Assessment";

/// A field is meaningful when its trimmed text is longer than this.
const MEANINGFUL_MIN_CHARS: usize = 3;

/// Raw text longer than this is kept verbatim even if it is not meaningful
/// once its prefix is removed.
const VERBATIM_MIN_CHARS: usize = 10;

/// Section headings clinicians paste in front of the actual text, longest
/// first so `History of Present Illness:` wins over `History:`.
const LABEL_PREFIXES: &[&str] = &[
    "history of present illness:",
    "chief complaint:",
    "assessment:",
    "diagnosis:",
    "impression:",
    "history:",
    "hpi:",
    "cc:",
];

/// Remove one known heading prefix (case-insensitive) and surrounding space.
pub fn strip_known_prefix(text: &str) -> &str {
    let text = text.trim();
    LABEL_PREFIXES
        .iter()
        .find(|prefix| {
            text.get(..prefix.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
        })
        .map_or(text, |prefix| text[prefix.len()..].trim())
}

/// The cleaned text of a field if it carries enough characters to label a
/// diagnosis.
fn meaningful(field: Option<&str>) -> Option<&str> {
    let trimmed = field?.trim();
    if trimmed.chars().count() <= MEANINGFUL_MIN_CHARS {
        return None;
    }
    Some(strip_known_prefix(trimmed)).filter(|label| label.chars().count() > MEANINGFUL_MIN_CHARS)
}

/// The trimmed raw text of a field if it is long enough to use verbatim.
fn verbatim(field: Option<&str>) -> Option<&str> {
    Some(field?.trim()).filter(|text| text.chars().count() > VERBATIM_MIN_CHARS)
}

/// Pick the diagnosis label for a record.
///
/// Order: history of present illness, chief complaint, assessment (each
/// cleaned of its heading); then history or chief complaint verbatim when
/// long enough; then [`FALLBACK_LABEL`]. Text is never truncated.
pub fn resolve_label(record: &RawMedicalRecord) -> String {
    let hpi = record.history_of_present_illness.as_deref();
    let complaint = record.chief_complaint.as_deref();
    let assessment = record.assessment.as_deref();

    meaningful(hpi)
        .or_else(|| meaningful(complaint))
        .or_else(|| meaningful(assessment))
        .or_else(|| verbatim(hpi))
        .or_else(|| verbatim(complaint))
        .unwrap_or(FALLBACK_LABEL)
        .to_string()
}

/// Labels that carry no diagnostic signal and are dropped from analytics.
pub fn is_low_signal(label: &str) -> bool {
    label == FALLBACK_LABEL || label.trim().chars().count() <= MEANINGFUL_MIN_CHARS
}
