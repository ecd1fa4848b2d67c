use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::phrase::Phrase;
use crate::pitch::Pitch;
use crate::trajectory::Trajectory;

pub type Flags = BTreeMap<String, bool>;

fn flags(labels: &[&str]) -> Flags {
    labels.iter().map(|l| (l.to_string(), false)).collect()
}

fn some_true(f: &Flags) -> bool {
    f.values().any(|&v| v)
}

/// Tags on one section of a track. `top_level` summarizes the others and
/// is derived when a document omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SectionCategorizationDocument")]
pub struct SectionCategorization {
    #[serde(rename = "Pre-Chiz Alap")]
    pub pre_chiz_alap: Flags,
    #[serde(rename = "Alap")]
    pub alap: Flags,
    #[serde(rename = "Composition Type")]
    pub composition_type: Flags,
    #[serde(rename = "Comp.-section/Tempo")]
    pub comp_section_tempo: Flags,
    #[serde(rename = "Tala")]
    pub tala: Flags,
    #[serde(rename = "Improvisation")]
    pub improvisation: Flags,
    #[serde(rename = "Other")]
    pub other: Flags,
    #[serde(rename = "Top Level")]
    pub top_level: String,
}

impl Default for SectionCategorization {
    fn default() -> Self {
        SectionCategorization {
            pre_chiz_alap: flags(&["Pre-Chiz Alap"]),
            alap: flags(&["Alap", "Jor", "Alap-Jhala"]),
            composition_type: flags(&[
                "Dhrupad",
                "Bandish",
                "Thumri",
                "Ghazal",
                "Qawwali",
                "Dhun",
                "Tappa",
                "Bhajan",
                "Kirtan",
                "Kriti",
                "Masitkhani Gat",
                "Razakhani Gat",
                "Ferozkhani Gat",
            ]),
            comp_section_tempo: flags(&[
                "Ati Vilambit",
                "Vilambit",
                "Madhya",
                "Drut",
                "Ati Drut",
                "Jhala",
            ]),
            tala: flags(&["Ektal", "Tintal", "Rupak"]),
            improvisation: flags(&["Improvisation"]),
            other: flags(&["Other"]),
            top_level: "None".to_string(),
        }
    }
}

impl SectionCategorization {
    /// The first matching summary in priority order.
    pub fn derive_top_level(&self) -> &'static str {
        let flag = |f: &Flags, key: &str| f.get(key).copied().unwrap_or(false);
        if flag(&self.pre_chiz_alap, "Pre-Chiz Alap") {
            "Pre-Chiz Alap"
        } else if some_true(&self.alap) {
            "Alap"
        } else if some_true(&self.composition_type)
            || some_true(&self.comp_section_tempo)
            || some_true(&self.tala)
        {
            "Composition"
        } else if flag(&self.improvisation, "Improvisation") {
            "Improvisation"
        } else if flag(&self.other, "Other") {
            "Other"
        } else {
            "None"
        }
    }
}

#[derive(Deserialize)]
struct SectionCategorizationDocument {
    #[serde(rename = "Pre-Chiz Alap")]
    pre_chiz_alap: Option<Flags>,
    #[serde(rename = "Alap")]
    alap: Option<Flags>,
    #[serde(rename = "Composition Type")]
    composition_type: Option<Flags>,
    #[serde(rename = "Comp.-section/Tempo", alias = "Composition-section/Tempo")]
    comp_section_tempo: Option<Flags>,
    #[serde(rename = "Tala")]
    tala: Option<Flags>,
    #[serde(rename = "Improvisation")]
    improvisation: Option<Flags>,
    #[serde(rename = "Other")]
    other: Option<Flags>,
    #[serde(rename = "Top Level")]
    top_level: Option<String>,
}

impl From<SectionCategorizationDocument> for SectionCategorization {
    fn from(doc: SectionCategorizationDocument) -> Self {
        let base = SectionCategorization::default();
        let mut c = SectionCategorization {
            pre_chiz_alap: doc.pre_chiz_alap.unwrap_or(base.pre_chiz_alap),
            alap: doc.alap.unwrap_or(base.alap),
            composition_type: doc.composition_type.unwrap_or(base.composition_type),
            comp_section_tempo: doc.comp_section_tempo.unwrap_or(base.comp_section_tempo),
            tala: doc.tala.unwrap_or(base.tala),
            improvisation: doc.improvisation.unwrap_or(base.improvisation),
            other: doc.other.unwrap_or(base.other),
            top_level: String::new(),
        };
        c.top_level = match doc.top_level {
            Some(top) => top,
            None => c.derive_top_level().to_string(),
        };
        c
    }
}

/// A borrowed run of phrases between two section starts.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub phrases: &'a [Phrase],
    pub categorization: &'a SectionCategorization,
    pub ad_hoc_categorization: &'a [String],
}

impl<'a> Section<'a> {
    pub fn trajectories(&self) -> Vec<&'a Trajectory> {
        self.phrases.iter().flat_map(|p| p.trajectories()).collect()
    }

    pub fn all_pitches(&self, repetition: bool) -> Vec<Pitch> {
        let mut pitches: Vec<Pitch> = self
            .phrases
            .iter()
            .flat_map(|p| p.all_pitches(true))
            .collect();
        if !repetition {
            pitches.dedup_by(|b, a| a.same_as(b));
        }
        pitches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_none() {
        let c = SectionCategorization::default();
        assert_eq!(c.top_level, "None");
        assert_eq!(c.derive_top_level(), "None");
        assert_eq!(c.composition_type.len(), 13);
    }

    #[test]
    fn test_top_level_derived_when_absent() {
        let c: SectionCategorization = serde_json::from_value(json!({
            "Pre-Chiz Alap": { "Pre-Chiz Alap": false },
            "Alap": { "Alap": false, "Jor": false, "Alap-Jhala": false },
            "Composition Type": { "Bandish": false },
            "Composition-section/Tempo": { "Drut": true },
            "Tala": { "Tintal": false }
        }))
        .unwrap();
        assert_eq!(c.top_level, "Composition");
        assert_eq!(c.comp_section_tempo["Drut"], true);
        assert_eq!(c.improvisation["Improvisation"], false);
        let out = serde_json::to_value(&c).unwrap();
        assert!(out.get("Comp.-section/Tempo").is_some());
        assert!(out.get("Composition-section/Tempo").is_none());
    }

    #[test]
    fn test_declared_top_level_kept() {
        let c: SectionCategorization = serde_json::from_value(json!({
            "Alap": { "Alap": true },
            "Top Level": "Other"
        }))
        .unwrap();
        assert_eq!(c.top_level, "Other");
        assert_eq!(c.derive_top_level(), "Alap");
    }

    #[test]
    fn test_priority_order() {
        let mut c = SectionCategorization::default();
        c.other.insert("Other".to_string(), true);
        assert_eq!(c.derive_top_level(), "Other");
        c.improvisation.insert("Improvisation".to_string(), true);
        assert_eq!(c.derive_top_level(), "Improvisation");
        c.pre_chiz_alap.insert("Pre-Chiz Alap".to_string(), true);
        assert_eq!(c.derive_top_level(), "Pre-Chiz Alap");
    }
}
