use serde::{Deserialize, Serialize};

use crate::error::{Result, SwaraError};
use crate::uid::UniqueId;

/// One level of a metric hierarchy: either `n` equal beats, or a cycle
/// built from unequal groups (e.g. rupak's 3 + 2 + 2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Layer {
    Uniform(u32),
    Mixed(Vec<u32>),
}

impl Layer {
    pub fn count(&self) -> u32 {
        match self {
            Layer::Uniform(n) => *n,
            Layer::Mixed(groups) => groups.iter().sum(),
        }
    }
}

/// A beat on the absolute timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pulse {
    pub real_time: f64,
    pub unique_id: String,
    pub meter_id: UniqueId,
    /// Shallowest hierarchy level that begins on this pulse.
    pub layer: usize,
}

/// A repeating rhythmic cycle placed at `start_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meter {
    pub hierarchy: Vec<Layer>,
    pub start_time: f64,
    /// Beats per minute at the top level.
    pub tempo: f64,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    #[serde(default)]
    pub unique_id: UniqueId,
}

fn default_repetitions() -> u32 {
    1
}

impl Default for Meter {
    fn default() -> Self {
        Meter {
            hierarchy: vec![Layer::Uniform(4), Layer::Uniform(4)],
            start_time: 0.0,
            tempo: 60.0,
            repetitions: 1,
            unique_id: UniqueId::default(),
        }
    }
}

impl Meter {
    pub fn new(hierarchy: Vec<Layer>, start_time: f64, tempo: f64, repetitions: u32) -> Result<Self> {
        if hierarchy.is_empty() || hierarchy.iter().any(|l| l.count() == 0) {
            return Err(SwaraError::InvalidValue(format!(
                "meter hierarchy needs non-empty levels: {:?}",
                hierarchy
            )));
        }
        if !(tempo > 0.0) {
            return Err(SwaraError::InvalidValue(format!("tempo must be positive: {}", tempo)));
        }
        if repetitions == 0 {
            return Err(SwaraError::InvalidValue(
                "a meter repeats at least once".to_string(),
            ));
        }
        Ok(Meter {
            hierarchy,
            start_time,
            tempo,
            repetitions,
            unique_id: UniqueId::default(),
        })
    }

    pub fn cycle_dur(&self) -> f64 {
        let top = self.hierarchy.first().map_or(0, Layer::count);
        top as f64 * 60.0 / self.tempo
    }

    pub fn dur_tot(&self) -> f64 {
        self.repetitions as f64 * self.cycle_dur()
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.dur_tot()
    }

    /// Meters that merely touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &Meter) -> bool {
        self.start_time < other.end_time() && other.start_time < self.end_time()
    }

    /// Every lowest-level pulse across all repetitions, in time order.
    pub fn all_pulses(&self) -> Vec<Pulse> {
        let per_cycle: u32 = self.hierarchy.iter().map(Layer::count).product();
        if per_cycle == 0 {
            return Vec::new();
        }
        // strides[k]: pulses spanned by one unit of level k
        let mut strides = vec![1u32; self.hierarchy.len()];
        for k in (0..self.hierarchy.len().saturating_sub(1)).rev() {
            strides[k] = strides[k + 1] * self.hierarchy[k + 1].count();
        }
        let pulse_dur = self.cycle_dur() / per_cycle as f64;
        let total = per_cycle * self.repetitions;
        (0..total)
            .map(|i| {
                let within = i % per_cycle;
                let layer = (0..strides.len())
                    .find(|&k| within % strides[k] == 0)
                    .unwrap_or(strides.len() - 1);
                Pulse {
                    real_time: self.start_time + i as f64 * pulse_dur,
                    unique_id: format!("{}-{}", self.unique_id, i),
                    meter_id: self.unique_id.clone(),
                    layer,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use serde_json::json;

    #[test]
    fn test_dur_tot() {
        let m = Meter::new(vec![Layer::Uniform(4)], 2.0, 120.0, 3).unwrap();
        assert!(approx_eq!(f64, m.cycle_dur(), 2.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, m.dur_tot(), 6.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, m.end_time(), 8.0, epsilon = 1e-12));
    }

    #[test]
    fn test_invalid_meters() {
        assert!(Meter::new(vec![], 0.0, 60.0, 1).is_err());
        assert!(Meter::new(vec![Layer::Uniform(0)], 0.0, 60.0, 1).is_err());
        assert!(Meter::new(vec![Layer::Uniform(4)], 0.0, 0.0, 1).is_err());
        assert!(Meter::new(vec![Layer::Uniform(4)], 0.0, 60.0, 0).is_err());
    }

    #[test]
    fn test_overlap_is_strict() {
        let a = Meter::new(vec![Layer::Uniform(4)], 0.0, 60.0, 1).unwrap();
        let touching = Meter::new(vec![Layer::Uniform(4)], 4.0, 60.0, 1).unwrap();
        let inside = Meter::new(vec![Layer::Uniform(2)], 1.0, 60.0, 1).unwrap();
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn test_pulses_with_mixed_top_level() {
        let m = Meter::new(vec![Layer::Mixed(vec![3, 2, 2]), Layer::Uniform(2)], 0.0, 60.0, 2).unwrap();
        let pulses = m.all_pulses();
        assert_eq!(pulses.len(), 28);
        let layers: Vec<usize> = pulses[..14].iter().map(|p| p.layer).collect();
        assert_eq!(layers, vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);
        assert!(approx_eq!(f64, pulses[1].real_time, 0.5, epsilon = 1e-12));
        assert_eq!(pulses[14].layer, 0);
        assert_eq!(pulses[3].unique_id, format!("{}-3", m.unique_id));
    }

    #[test]
    fn test_json() {
        let m: Meter = serde_json::from_value(json!({
            "hierarchy": [[3, 2, 2], 4],
            "startTime": 1.5,
            "tempo": 90.0,
            "uniqueId": "m1"
        }))
        .unwrap();
        assert_eq!(m.repetitions, 1);
        assert_eq!(m.hierarchy[1], Layer::Uniform(4));
        let out = serde_json::to_value(&m).unwrap();
        assert_eq!(out["hierarchy"], json!([[3, 2, 2], 4]));
        assert_eq!(out["uniqueId"], json!("m1"));
    }
}
