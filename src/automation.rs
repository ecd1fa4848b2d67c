use serde::{Deserialize, Serialize};

use crate::error::{Result, SwaraError};
use crate::util::{close_to, ends, starts};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationValue {
    #[serde(rename(serialize = "normTime"), alias = "normTime")]
    pub norm_time: f64,
    pub value: f64,
}

impl AutomationValue {
    pub fn new(norm_time: f64, value: f64) -> Self {
        AutomationValue { norm_time, value }
    }
}

/// A value lane over a trajectory's normalized time, linearly interpolated
/// between breakpoints. Used for volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AutomationDocument")]
pub struct Automation {
    values: Vec<AutomationValue>,
}

impl Default for Automation {
    fn default() -> Self {
        Automation {
            values: vec![AutomationValue::new(0.0, 1.0), AutomationValue::new(1.0, 1.0)],
        }
    }
}

impl Automation {
    /// An empty list yields the flat full-volume lane.
    pub fn new(mut values: Vec<AutomationValue>) -> Self {
        if values.is_empty() {
            return Automation::default();
        }
        values.sort_by(|a, b| a.norm_time.total_cmp(&b.norm_time));
        Automation { values }
    }

    pub fn values(&self) -> &[AutomationValue] {
        &self.values
    }

    /// Insert a breakpoint, replacing the value of an existing one at the
    /// same time.
    pub fn add_value(&mut self, norm_time: f64, value: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&norm_time) {
            return Err(SwaraError::InvalidValue(format!(
                "normTime must be between 0 and 1: {}",
                norm_time
            )));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(SwaraError::InvalidValue(format!(
                "automation value must be between 0 and 1: {}",
                value
            )));
        }
        match self.values.iter_mut().find(|v| v.norm_time == norm_time) {
            Some(existing) => existing.value = value,
            None => {
                self.values.push(AutomationValue::new(norm_time, value));
                self.values
                    .sort_by(|a, b| a.norm_time.total_cmp(&b.norm_time));
            }
        }
        Ok(())
    }

    /// Remove an interior breakpoint; the endpoints are fixed.
    pub fn remove_value(&mut self, idx: usize) -> Result<()> {
        if idx >= self.values.len() {
            return Err(SwaraError::InvalidValue(format!(
                "automation index {} out of range 0..{}",
                idx,
                self.values.len()
            )));
        }
        if idx == 0 || idx == self.values.len() - 1 {
            return Err(SwaraError::InvalidValue(
                "cannot remove the first or last automation value".to_string(),
            ));
        }
        self.values.remove(idx);
        Ok(())
    }

    pub fn value_at_x(&self, x: f64) -> Result<f64> {
        let out_of_bounds = SwaraError::OutOfBounds {
            x,
            start: 0.0,
            end: 1.0,
        };
        if !(0.0..=1.0).contains(&x) {
            return Err(out_of_bounds);
        }
        let idx = self
            .values
            .iter()
            .rposition(|v| v.norm_time <= x)
            .ok_or(out_of_bounds)?;
        if idx == self.values.len() - 1 {
            return Ok(self.values[idx].value);
        }
        let start = self.values[idx];
        let end = self.values[idx + 1];
        let slope = (end.value - start.value) / (end.norm_time - start.norm_time);
        Ok(start.value + slope * (x - start.norm_time))
    }

    /// Sample the lane every `value_dur` over `duration`, scaled by `max`.
    pub fn generate_value_curve(&self, value_dur: f64, duration: f64, max: f64) -> Result<Vec<f64>> {
        if value_dur <= 0.0 {
            return Err(SwaraError::InvalidValue(format!(
                "sample spacing must be positive: {}",
                value_dur
            )));
        }
        let count = (duration / value_dur).round() as usize;
        if count == 0 {
            return Ok(vec![max * self.value_at_x(0.0)?]);
        }
        (0..=count)
            .map(|i| Ok(max * self.value_at_x(i as f64 / count as f64)?))
            .collect()
    }

    /// Split into one lane per entry of `dur_array`, each renormalized to
    /// its own 0..1 span.
    pub fn partition(&self, dur_array: &[f64]) -> Result<Vec<Automation>> {
        let starts = starts(dur_array);
        let ends = ends(dur_array);
        let mut parts = starts
            .iter()
            .zip(&ends)
            .map(|(&s, &e)| {
                Ok(Automation {
                    values: vec![
                        AutomationValue::new(0.0, self.value_at_x(s.min(1.0))?),
                        AutomationValue::new(1.0, self.value_at_x(e.min(1.0))?),
                    ],
                })
            })
            .collect::<Result<Vec<_>>>()?;
        for v in &self.values {
            if starts.contains(&v.norm_time) || ends.contains(&v.norm_time) {
                continue;
            }
            for (i, (&s, &e)) in starts.iter().zip(&ends).enumerate() {
                if v.norm_time > s && v.norm_time < e {
                    parts[i].add_value((v.norm_time - s) / (e - s), v.value)?;
                }
            }
        }
        Ok(parts)
    }

    /// Join consecutive lanes back into one, dropping duplicate times and
    /// collinear interior points.
    pub fn compress(automations: &[Automation], dur_array: &[f64]) -> Automation {
        let mut all: Vec<AutomationValue> = Vec::new();
        let mut offset = 0.0;
        for (automation, dur) in automations.iter().zip(dur_array) {
            for v in &automation.values {
                let t = v.norm_time * dur + offset;
                if !all.iter().any(|a| a.norm_time == t) {
                    all.push(AutomationValue::new(t, v.value));
                }
            }
            offset += dur;
        }
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..all.len().saturating_sub(2) {
                let (a, b, c) = (all[i], all[i + 1], all[i + 2]);
                let slope1 = (b.value - a.value) / (b.norm_time - a.norm_time);
                let slope2 = (c.value - b.value) / (c.norm_time - b.norm_time);
                if close_to(slope1, slope2) {
                    all.remove(i + 1);
                    changed = true;
                    break;
                }
            }
        }
        Automation::new(all)
    }
}

#[derive(Deserialize)]
struct AutomationDocument {
    #[serde(default)]
    values: Vec<AutomationValue>,
}

impl From<AutomationDocument> for Automation {
    fn from(doc: AutomationDocument) -> Self {
        Automation::new(doc.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use serde_json::json;

    #[test]
    fn test_default_is_flat() {
        let a = Automation::default();
        assert_eq!(a.values().len(), 2);
        assert_eq!(a.value_at_x(0.5).unwrap(), 1.0);
    }

    #[test]
    fn test_add_and_interpolate() {
        let mut a = Automation::default();
        a.add_value(0.5, 0.0).unwrap();
        assert!(approx_eq!(f64, a.value_at_x(0.25).unwrap(), 0.5, epsilon = 1e-12));
        a.add_value(0.5, 0.5).unwrap();
        assert_eq!(a.values().len(), 3);
        assert!(a.add_value(1.5, 0.5).is_err());
        assert!(a.add_value(0.5, 2.0).is_err());
    }

    #[test]
    fn test_remove_value_keeps_endpoints() {
        let mut a = Automation::default();
        a.add_value(0.5, 0.2).unwrap();
        assert!(a.remove_value(0).is_err());
        assert!(a.remove_value(2).is_err());
        assert!(a.remove_value(5).is_err());
        a.remove_value(1).unwrap();
        assert_eq!(a.values().len(), 2);
    }

    #[test]
    fn test_value_at_x_bounds() {
        let a = Automation::default();
        assert!(matches!(a.value_at_x(-0.1), Err(SwaraError::OutOfBounds { .. })));
        assert!(a.value_at_x(1.1).is_err());
    }

    #[test]
    fn test_value_curve() {
        let a = Automation::new(vec![AutomationValue::new(0.0, 0.0), AutomationValue::new(1.0, 1.0)]);
        let curve = a.generate_value_curve(0.25, 1.0, 2.0).unwrap();
        assert_eq!(curve.len(), 5);
        assert!(approx_eq!(f64, curve[2], 1.0, epsilon = 1e-12));
    }

    #[test]
    fn test_partition_then_compress() {
        let a = Automation::new(vec![
            AutomationValue::new(0.0, 0.0),
            AutomationValue::new(0.25, 1.0),
            AutomationValue::new(1.0, 0.0),
        ]);
        let parts = a.partition(&[0.5, 0.5]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].values().len(), 3);
        assert!(approx_eq!(f64, parts[0].values()[1].norm_time, 0.5, epsilon = 1e-12));
        let joined = Automation::compress(&parts, &[0.5, 0.5]);
        assert_eq!(joined.values().len(), 3);
        assert!(approx_eq!(f64, joined.value_at_x(0.25).unwrap(), 1.0, epsilon = 1e-9));
    }

    #[test]
    fn test_json_keys() {
        let a: Automation = serde_json::from_value(json!({
            "values": [{ "normTime": 1, "value": 0.5 }, { "norm_time": 0, "value": 1 }]
        }))
        .unwrap();
        assert_eq!(a.values()[0].norm_time, 0.0);
        let out = serde_json::to_value(&a).unwrap();
        assert_eq!(out["values"][1], json!({ "normTime": 1.0, "value": 0.5 }));
    }
}
