use serde::{Deserialize, Serialize};

use crate::pitch::{Pitch, DEFAULT_FUNDAMENTAL};
use crate::uid::UniqueId;

/// A strum of the drone strings at one point in a phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"), from = "ChikariDocument")]
pub struct Chikari {
    pub fundamental: f64,
    pub pitches: Vec<Pitch>,
    pub unique_id: UniqueId,
}

impl Default for Chikari {
    fn default() -> Self {
        Chikari::new(default_pitches(), DEFAULT_FUNDAMENTAL, None)
    }
}

impl Chikari {
    /// Every pitch is retuned to `fundamental`.
    pub fn new(pitches: Vec<Pitch>, fundamental: f64, unique_id: Option<UniqueId>) -> Self {
        Chikari {
            fundamental,
            pitches: pitches
                .into_iter()
                .map(|p| p.with_fundamental(fundamental))
                .collect(),
            unique_id: unique_id.unwrap_or_default(),
        }
    }

    pub fn update_fundamental(&mut self, fundamental: f64) {
        self.fundamental = fundamental;
        for p in &mut self.pitches {
            p.fundamental = fundamental;
        }
    }

    pub fn freqs(&self) -> Vec<f64> {
        self.pitches.iter().map(Pitch::frequency).collect()
    }
}

/// A chikari placed on the piece timeline, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChikariDisplay {
    pub time: f64,
    pub phrase_time_key: String,
    pub phrase_idx: usize,
    pub track: usize,
    pub chikari: Chikari,
    pub u_id: UniqueId,
}

fn default_pitches() -> Vec<Pitch> {
    // sa, sa, pa, ga from the top string down; all valid degrees
    [(0u8, 2), (0, 1), (4, 0), (2, 0)]
        .into_iter()
        .filter_map(|(swara, oct)| Pitch::new(swara, oct, true).ok())
        .collect()
}

#[derive(Deserialize)]
struct ChikariDocument {
    #[serde(default)]
    fundamental: Option<f64>,
    #[serde(default)]
    pitches: Option<Vec<Pitch>>,
    #[serde(default, alias = "uniqueId")]
    unique_id: Option<UniqueId>,
}

impl From<ChikariDocument> for Chikari {
    fn from(doc: ChikariDocument) -> Self {
        Chikari::new(
            doc.pitches.unwrap_or_else(default_pitches),
            doc.fundamental.unwrap_or(DEFAULT_FUNDAMENTAL),
            doc.unique_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use serde_json::json;

    #[test]
    fn test_default_chikari() {
        let c = Chikari::default();
        assert_eq!(c.pitches.len(), 4);
        assert!(approx_eq!(f64, c.freqs()[0], DEFAULT_FUNDAMENTAL * 4.0, epsilon = 1e-9));
        assert_eq!(c.pitches[2].swara(), 4);
    }

    #[test]
    fn test_fundamental_applies_to_pitches() {
        let mut c = Chikari::new(vec![Pitch::default()], 100.0, None);
        assert!(approx_eq!(f64, c.freqs()[0], 100.0, epsilon = 1e-9));
        c.update_fundamental(200.0);
        assert!(approx_eq!(f64, c.freqs()[0], 200.0, epsilon = 1e-9));
    }

    #[test]
    fn test_json() {
        let c: Chikari = serde_json::from_value(json!({
            "fundamental": 150.0,
            "uniqueId": "c1"
        }))
        .unwrap();
        assert_eq!(c.unique_id.as_str(), "c1");
        assert_eq!(c.pitches[0].fundamental, 150.0);
        let out = serde_json::to_value(&c).unwrap();
        assert_eq!(out["uniqueId"], json!("c1"));
        assert_eq!(out["pitches"].as_array().unwrap().len(), 4);
    }
}
