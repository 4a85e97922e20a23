//! Symptom and medication keyword extraction.
//!
//! Matching is case-insensitive substring search against a catalogue of
//! patterns per tag. Symptoms additionally carry a table of negated forms:
//! if any negated form of a symptom appears in the text, the symptom tag is
//! suppressed even when its bare pattern also matches elsewhere.

use std::collections::{BTreeSet, HashMap};

use crate::models::{MedicalTag, TagKind};

/// One catalogue entry: a tag and the substrings that signal it.
#[derive(Debug, Clone)]
struct TagRule {
    tag: MedicalTag,
    patterns: Vec<String>,
}

/// Extracts [`MedicalTag`]s from free clinical text.
pub struct TagExtractor {
    /// Catalogue in emission order
    rules: Vec<TagRule>,
    /// Tag name → negated forms that suppress it
    negations: HashMap<String, Vec<String>>,
}

impl Default for TagExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TagExtractor {
    /// Create an extractor with the default catalogue and negation table.
    pub fn new() -> Self {
        let mut extractor = Self {
            rules: Vec::new(),
            negations: HashMap::new(),
        };

        for (name, patterns) in Self::default_symptoms() {
            extractor.add_pattern(MedicalTag::symptom(*name), patterns);
        }
        for (name, patterns) in Self::default_medications() {
            extractor.add_pattern(MedicalTag::medication(*name), patterns);
        }
        for (name, negated) in Self::default_negations() {
            for form in *negated {
                extractor.add_negation(name, form);
            }
        }

        extractor
    }

    /// Extract every tag whose pattern occurs in `text` and is not negated.
    pub fn extract(&self, text: &str) -> BTreeSet<MedicalTag> {
        let lower = text.to_lowercase();

        self.rules
            .iter()
            .filter(|rule| rule.patterns.iter().any(|p| lower.contains(p.as_str())))
            .filter(|rule| !self.is_negated(&rule.tag.name, &lower))
            .map(|rule| rule.tag.clone())
            .collect()
    }

    /// Whether any negated form of `tag` appears in already-lowercased text.
    fn is_negated(&self, tag: &str, lower: &str) -> bool {
        self.negations
            .get(tag)
            .map_or(false, |forms| forms.iter().any(|f| lower.contains(f.as_str())))
    }

    /// Negated forms registered for a tag.
    pub fn negated_forms(&self, tag: &str) -> &[String] {
        self.negations
            .get(tag)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Kind of a catalogued tag name.
    pub fn kind_of(&self, tag: &str) -> Option<TagKind> {
        self.rules
            .iter()
            .find(|rule| rule.tag.name == tag)
            .map(|rule| rule.tag.kind)
    }

    /// Add patterns for a tag, creating the catalogue entry if needed.
    pub fn add_pattern(&mut self, tag: MedicalTag, patterns: &[&str]) {
        let patterns = patterns.iter().map(|p| p.to_lowercase());
        match self.rules.iter_mut().find(|rule| rule.tag == tag) {
            Some(rule) => rule.patterns.extend(patterns),
            None => self.rules.push(TagRule {
                tag,
                patterns: patterns.collect(),
            }),
        }
    }

    /// Register a phrase that negates a tag.
    pub fn add_negation(&mut self, tag: &str, negated_form: &str) {
        self.negations
            .entry(tag.to_string())
            .or_default()
            .push(negated_form.to_lowercase());
    }

    /// Default symptom catalogue.
    fn default_symptoms() -> &'static [(&'static str, &'static [&'static str])] {
        &[
            ("fever", &["fever", "febrile", "pyrexia"]),
            ("cough", &["cough"]),
            ("diarrhea", &["diarrhea", "diarrhoea", "loose stool", "lbm"]),
            ("vomiting", &["vomit", "emesis"]),
            ("nausea", &["nausea", "nauseous"]),
            ("headache", &["headache", "cephalgia"]),
            ("chest pain", &["chest pain"]),
            ("abdominal pain", &["abdominal pain", "stomach ache", "stomachache"]),
            ("shortness of breath", &["shortness of breath", "dyspnea", "difficulty breathing"]),
            ("colds", &["colds", "runny nose", "rhinorrhea", "nasal congestion"]),
            ("sore throat", &["sore throat"]),
            ("rash", &["rash"]),
            ("dizziness", &["dizziness", "dizzy", "vertigo"]),
            ("fatigue", &["fatigue", "weakness", "malaise"]),
            ("body pain", &["body pain", "body ache", "myalgia"]),
        ]
    }

    /// Default medication catalogue.
    fn default_medications() -> &'static [(&'static str, &'static [&'static str])] {
        &[
            ("paracetamol", &["paracetamol", "acetaminophen"]),
            ("ibuprofen", &["ibuprofen"]),
            ("amoxicillin", &["amoxicillin", "amoxicilin"]),
            ("cetirizine", &["cetirizine"]),
            ("salbutamol", &["salbutamol", "albuterol"]),
            ("oral rehydration salts", &["oral rehydration", "ors sachet"]),
            ("metformin", &["metformin"]),
            ("amlodipine", &["amlodipine"]),
            ("losartan", &["losartan"]),
            ("mefenamic acid", &["mefenamic"]),
            ("zinc", &["zinc sulfate", "zinc supplement"]),
        ]
    }

    /// Symptom → negated forms.
    ///
    /// | symptom | negated forms |
    /// |---|---|
    /// | fever | no fever, afebrile, denies fever, without fever |
    /// | cough | no cough, denies cough, without cough |
    /// | diarrhea | no diarrhea, no diarrhoea, no lbm, denies diarrhea |
    /// | vomiting | no vomiting, denies vomiting, without vomiting |
    /// | nausea | no nausea, denies nausea |
    /// | headache | no headache, denies headache |
    /// | chest pain | no chest pain, denies chest pain |
    /// | abdominal pain | no abdominal pain, denies abdominal pain |
    /// | shortness of breath | no shortness of breath, no dyspnea, denies shortness of breath |
    /// | colds | no colds |
    /// | sore throat | no sore throat |
    /// | rash | no rash, without rash |
    /// | dizziness | no dizziness, denies dizziness |
    /// | fatigue | no fatigue, no weakness |
    /// | body pain | no body pain, no body ache |
    fn default_negations() -> &'static [(&'static str, &'static [&'static str])] {
        &[
            ("fever", &["no fever", "afebrile", "denies fever", "without fever"]),
            ("cough", &["no cough", "denies cough", "without cough"]),
            ("diarrhea", &["no diarrhea", "no diarrhoea", "no lbm", "denies diarrhea"]),
            ("vomiting", &["no vomiting", "denies vomiting", "without vomiting"]),
            ("nausea", &["no nausea", "denies nausea"]),
            ("headache", &["no headache", "denies headache"]),
            ("chest pain", &["no chest pain", "denies chest pain"]),
            ("abdominal pain", &["no abdominal pain", "denies abdominal pain"]),
            (
                "shortness of breath",
                &["no shortness of breath", "no dyspnea", "denies shortness of breath"],
            ),
            ("colds", &["no colds"]),
            ("sore throat", &["no sore throat"]),
            ("rash", &["no rash", "without rash"]),
            ("dizziness", &["no dizziness", "denies dizziness"]),
            ("fatigue", &["no fatigue", "no weakness"]),
            ("body pain", &["no body pain", "no body ache"]),
        ]
    }
}
