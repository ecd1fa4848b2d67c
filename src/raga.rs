use serde::{Deserialize, Serialize};

use crate::error::{Result, SwaraError};
use crate::pitch::{Pitch, PitchOptions, Ratio, DEFAULT_FUNDAMENTAL};

const SARGAM: [&str; 7] = ["sa", "re", "ga", "ma", "pa", "dha", "ni"];
const CLOSE: f64 = 1e-6;

/// Which forms of a movable scale degree a raga admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    pub lowered: bool,
    pub raised: bool,
}

impl Allowance {
    const RAISED: Allowance = Allowance {
        lowered: false,
        raised: true,
    };
}

/// Allowed pitches of a raga. Sa and pa are on or off; the other
/// degrees can admit either or both forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub sa: bool,
    pub re: Allowance,
    pub ga: Allowance,
    pub ma: Allowance,
    pub pa: bool,
    pub dha: Allowance,
    pub ni: Allowance,
}

impl Default for RuleSet {
    /// Yaman: every degree in its raised form.
    fn default() -> Self {
        RuleSet {
            sa: true,
            re: Allowance::RAISED,
            ga: Allowance::RAISED,
            ma: Allowance::RAISED,
            pa: true,
            dha: Allowance::RAISED,
            ni: Allowance::RAISED,
        }
    }
}

impl RuleSet {
    fn allowance(&self, swara: u8) -> Option<Allowance> {
        match swara {
            1 => Some(self.re),
            2 => Some(self.ga),
            3 => Some(self.ma),
            5 => Some(self.dha),
            6 => Some(self.ni),
            _ => None,
        }
    }

    fn fixed(&self, swara: u8) -> bool {
        match swara {
            0 => self.sa,
            _ => self.pa,
        }
    }

    pub fn allows(&self, swara: u8, raised: bool) -> bool {
        match self.allowance(swara) {
            Some(a) if raised => a.raised,
            Some(a) => a.lowered,
            None => swara < 7 && self.fixed(swara),
        }
    }

    /// Every allowed `(swara, raised)` pair, ascending within the octave.
    pub fn allowed(&self) -> Vec<(u8, bool)> {
        let mut out = Vec::new();
        for swara in 0..7u8 {
            match self.allowance(swara) {
                Some(a) => {
                    if a.lowered {
                        out.push((swara, false));
                    }
                    if a.raised {
                        out.push((swara, true));
                    }
                }
                None => {
                    if self.fixed(swara) {
                        out.push((swara, true));
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningPair {
    pub lowered: f64,
    pub raised: f64,
}

/// Ratio to the fundamental for every form of every scale degree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub sa: f64,
    pub re: TuningPair,
    pub ga: TuningPair,
    pub ma: TuningPair,
    pub pa: f64,
    pub dha: TuningPair,
    pub ni: TuningPair,
}

impl Default for Tuning {
    /// Twelve-tone equal temperament.
    fn default() -> Self {
        let et = |n: i32| 2f64.powf(n as f64 / 12.0);
        let pair = |n: i32| TuningPair {
            lowered: et(n),
            raised: et(n + 1),
        };
        Tuning {
            sa: et(0),
            re: pair(1),
            ga: pair(3),
            ma: pair(5),
            pa: et(7),
            dha: pair(8),
            ni: pair(10),
        }
    }
}

impl Tuning {
    fn pair_mut(&mut self, swara: u8) -> Option<&mut TuningPair> {
        match swara {
            1 => Some(&mut self.re),
            2 => Some(&mut self.ga),
            3 => Some(&mut self.ma),
            5 => Some(&mut self.dha),
            6 => Some(&mut self.ni),
            _ => None,
        }
    }

    pub fn get(&self, swara: u8, raised: bool) -> f64 {
        let pair = match swara {
            0 => return self.sa,
            4 => return self.pa,
            1 => self.re,
            2 => self.ga,
            3 => self.ma,
            5 => self.dha,
            _ => self.ni,
        };
        if raised {
            pair.raised
        } else {
            pair.lowered
        }
    }

    pub fn set(&mut self, swara: u8, raised: bool, ratio: f64) {
        match swara {
            0 => self.sa = ratio,
            4 => self.pa = ratio,
            _ => {
                if let Some(pair) = self.pair_mut(swara) {
                    if raised {
                        pair.raised = ratio;
                    } else {
                        pair.lowered = ratio;
                    }
                }
            }
        }
    }
}

/// Constructor input for [`Raga`].
#[derive(Debug, Clone, Default)]
pub struct RagaOptions {
    pub name: Option<String>,
    pub fundamental: Option<f64>,
    pub rule_set: Option<RuleSet>,
    pub tuning: Option<Tuning>,
    pub ratios: Option<Vec<f64>>,
}

/// Scale and tuning system that pitches resolve against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"), from = "RagaDocument")]
pub struct Raga {
    pub name: String,
    pub fundamental: f64,
    rule_set: RuleSet,
    tuning: Tuning,
    /// One ratio per allowed pitch, ascending.
    ratios: Vec<f64>,
}

impl Default for Raga {
    fn default() -> Self {
        Raga::new(RagaOptions::default())
    }
}

impl Raga {
    /// Ratios absent or inconsistent with the rule set are rebuilt from
    /// the tuning; the final ratios are written back into the tuning.
    pub fn new(opts: RagaOptions) -> Self {
        let rule_set = opts.rule_set.unwrap_or_default();
        let mut tuning = opts.tuning.unwrap_or_default();
        let allowed = rule_set.allowed();
        let ratios = match opts.ratios {
            Some(r) if r.len() == allowed.len() => r,
            _ => allowed.iter().map(|&(s, raised)| tuning.get(s, raised)).collect(),
        };
        for (&(swara, raised), &ratio) in allowed.iter().zip(&ratios) {
            tuning.set(swara, raised, ratio);
        }
        Raga {
            name: opts.name.unwrap_or_else(|| "Yaman".to_string()),
            fundamental: opts.fundamental.unwrap_or(DEFAULT_FUNDAMENTAL),
            rule_set,
            tuning,
            ratios,
        }
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }

    pub fn rule_set_num_pitches(&self) -> usize {
        self.rule_set.allowed().len()
    }

    /// Sargam initials of the allowed pitches; upper case when raised.
    pub fn sargam_letters(&self) -> Vec<String> {
        self.rule_set
            .allowed()
            .into_iter()
            .map(|(s, raised)| letter(s, raised))
            .collect()
    }

    pub fn sargam_names(&self) -> Vec<String> {
        self.rule_set
            .allowed()
            .into_iter()
            .map(|(s, raised)| {
                let name = SARGAM[s as usize];
                if raised {
                    let mut chars = name.chars();
                    chars
                        .next()
                        .map(|c| c.to_uppercase().collect::<String>() + chars.as_str())
                        .unwrap_or_default()
                } else {
                    name.to_string()
                }
            })
            .collect()
    }

    /// Seven-entry ratio table for pitches: the raga's own ratios where
    /// the rule set allows a form, tuning defaults elsewhere.
    pub fn stratified_ratios(&self) -> Vec<Ratio> {
        let mut ratios = self.ratios.iter().copied();
        let mut take = |swara: u8, raised: bool| {
            if self.rule_set.allows(swara, raised) {
                ratios.next().unwrap_or_else(|| self.tuning.get(swara, raised))
            } else {
                self.tuning.get(swara, raised)
            }
        };
        (0..7u8)
            .map(|swara| {
                if swara == 0 || swara == 4 {
                    Ratio::Fixed(take(swara, true))
                } else {
                    let lowered = take(swara, false);
                    let raised = take(swara, true);
                    Ratio::Variants([lowered, raised])
                }
            })
            .collect()
    }

    /// All octave instances of the raga's pitches between `low` and `high`
    /// Hz, sorted by frequency.
    pub fn get_pitches(&self, low: f64, high: f64) -> Result<Vec<Pitch>> {
        let ratios = self.stratified_ratios();
        let mut pitches = Vec::new();
        for (swara, raised) in self.rule_set.allowed() {
            let freq = self.tuning.get(swara, raised) * self.fundamental;
            let octs_below = (low / freq).log2().ceil() as i32;
            let octs_above = (high / freq).log2().floor() as i32;
            for oct in octs_below..=octs_above {
                pitches.push(Pitch::from_options(PitchOptions {
                    swara: Some(swara),
                    oct: Some(oct),
                    raised: Some(raised),
                    fundamental: Some(self.fundamental),
                    ratios: Some(ratios.clone()),
                    log_offset: None,
                })?);
            }
        }
        pitches.sort_by(|a, b| a.frequency().total_cmp(&b.frequency()));
        pitches.retain(|p| p.frequency() >= low && p.frequency() <= high);
        Ok(pitches)
    }

    pub fn get_frequencies(&self, low: f64, high: f64) -> Vec<f64> {
        let mut freqs: Vec<f64> = Vec::new();
        for ratio in &self.ratios {
            let f = ratio * self.fundamental;
            let low_exp = (low / f).log2().ceil() as i32;
            let high_exp = (high / f).log2().floor() as i32;
            freqs.extend((low_exp..=high_exp).map(|exp| f * 2f64.powi(exp)));
        }
        freqs.sort_by(f64::total_cmp);
        freqs
    }

    /// Pitch numbers in `low..=high` that the rule set allows.
    pub fn get_pitch_numbers(&self, low: i32, high: i32) -> Vec<i32> {
        (low..=high)
            .filter(|&n| {
                let (swara, raised) =
                    Pitch::chroma_to_scale_degree(Pitch::pitch_number_to_chroma(n));
                self.rule_set.allows(swara, raised)
            })
            .collect()
    }

    pub fn pitch_number_to_sargam_letter(&self, pitch_number: i32) -> Option<String> {
        let (swara, raised) =
            Pitch::chroma_to_scale_degree(Pitch::pitch_number_to_chroma(pitch_number));
        self.rule_set
            .allows(swara, raised)
            .then(|| letter(swara, raised))
    }

    /// Position of a pitch number in the raga's own scale, counting from
    /// the central sa.
    pub fn pitch_number_to_scale_number(&self, pitch_number: i32) -> Result<i32> {
        let oct = pitch_number.div_euclid(12);
        let chroma = pitch_number.rem_euclid(12);
        let main_oct = self.get_pitch_numbers(0, 11);
        let idx = main_oct.iter().position(|&n| n == chroma).ok_or_else(|| {
            SwaraError::InvalidValue(format!("pitch number {} is not in the raga", pitch_number))
        })?;
        Ok(idx as i32 + oct * main_oct.len() as i32)
    }

    pub fn scale_number_to_pitch_number(&self, scale_number: i32) -> Result<i32> {
        let main_oct = self.get_pitch_numbers(0, 11);
        if main_oct.is_empty() {
            return Err(SwaraError::InvalidValue("raga has no pitches".to_string()));
        }
        let len = main_oct.len() as i32;
        let oct = scale_number.div_euclid(len);
        Ok(main_oct[scale_number.rem_euclid(len) as usize] + oct * 12)
    }

    pub fn scale_number_to_sargam_letter(&self, scale_number: i32) -> Result<Option<String>> {
        Ok(self.pitch_number_to_sargam_letter(self.scale_number_to_pitch_number(scale_number)?))
    }

    /// Quantize a log2 frequency to the nearest raga pitch; the residual is
    /// kept as the pitch's log offset.
    pub fn pitch_from_log_freq(&self, log_freq: f64) -> Result<Pitch> {
        let quantized = self
            .get_frequencies(75.0, 2400.0)
            .into_iter()
            .map(f64::log2)
            .min_by(|a, b| (a - log_freq).abs().total_cmp(&(b - log_freq).abs()))
            .ok_or_else(|| SwaraError::InvalidValue("raga has no pitches".to_string()))?;
        let log_offset = log_freq - quantized;
        let mut log_diff = quantized - self.fundamental.log2();
        if (log_diff - log_diff.round()).abs() < CLOSE {
            log_diff = log_diff.round();
        }
        let oct = log_diff.floor();
        log_diff -= oct;
        let target = 2f64.powf(log_diff);
        let idx = self
            .ratios
            .iter()
            .position(|r| (r - target).abs() < CLOSE)
            .ok_or_else(|| {
                SwaraError::InvalidValue(format!("no raga ratio matches {}", target))
            })?;
        let (swara, raised) = self.rule_set.allowed()[idx];
        Pitch::from_options(PitchOptions {
            swara: Some(swara),
            oct: Some(oct as i32),
            raised: Some(raised),
            fundamental: Some(self.fundamental),
            ratios: Some(self.stratified_ratios()),
            log_offset: Some(log_offset),
        })
    }

    /// Default drone pitches: sa two octaves and one octave up.
    pub fn chikari_pitches(&self) -> Vec<Pitch> {
        [2, 1]
            .into_iter()
            .map(|oct| {
                let mut pitch = Pitch::default().with_fundamental(self.fundamental);
                pitch.oct = oct;
                pitch
            })
            .collect()
    }
}

fn letter(swara: u8, raised: bool) -> String {
    let initial = &SARGAM[swara as usize][..1];
    if raised {
        initial.to_uppercase()
    } else {
        initial.to_string()
    }
}

#[derive(Deserialize)]
struct RagaDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fundamental: Option<f64>,
    #[serde(default, alias = "ruleSet")]
    rule_set: Option<RuleSet>,
    #[serde(default)]
    tuning: Option<Tuning>,
    #[serde(default)]
    ratios: Option<Vec<f64>>,
}

impl From<RagaDocument> for Raga {
    fn from(doc: RagaDocument) -> Self {
        Raga::new(RagaOptions {
            name: doc.name,
            fundamental: doc.fundamental,
            rule_set: doc.rule_set,
            tuning: doc.tuning,
            ratios: doc.ratios,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn bhairav() -> RuleSet {
        RuleSet {
            sa: true,
            re: Allowance {
                lowered: true,
                raised: false,
            },
            ga: Allowance::RAISED,
            ma: Allowance {
                lowered: true,
                raised: false,
            },
            pa: true,
            dha: Allowance {
                lowered: true,
                raised: false,
            },
            ni: Allowance::RAISED,
        }
    }

    #[test]
    fn test_default_raga_is_yaman_et() {
        let raga = Raga::default();
        assert_eq!(raga.name, "Yaman");
        assert_eq!(raga.rule_set_num_pitches(), 7);
        let expected: Vec<f64> = [0, 2, 4, 6, 7, 9, 11]
            .iter()
            .map(|&n| 2f64.powf(n as f64 / 12.0))
            .collect();
        assert_eq!(raga.ratios(), expected.as_slice());
        assert_eq!(raga.sargam_letters(), vec!["S", "R", "G", "M", "P", "D", "N"]);
    }

    #[test]
    fn test_mismatched_ratios_are_rebuilt() {
        let raga = Raga::new(RagaOptions {
            ratios: Some(vec![1.0, 1.1]),
            ..Default::default()
        });
        assert_eq!(raga.ratios().len(), 7);
    }

    #[test]
    fn test_custom_ratios_written_into_tuning() {
        let ratios = vec![1.0, 1.1, 1.25, 1.4, 1.5, 1.66, 1.875];
        let raga = Raga::new(RagaOptions {
            ratios: Some(ratios.clone()),
            ..Default::default()
        });
        assert_eq!(raga.tuning().re.raised, 1.1);
        assert_eq!(raga.tuning().pa, 1.5);
        let strat = raga.stratified_ratios();
        assert_eq!(strat[1], Ratio::Variants([2f64.powf(1.0 / 12.0), 1.1]));
        assert_eq!(strat[4], Ratio::Fixed(1.5));
    }

    #[test]
    fn test_bhairav_letters_and_numbers() {
        let raga = Raga::new(RagaOptions {
            rule_set: Some(bhairav()),
            ..Default::default()
        });
        assert_eq!(raga.sargam_letters(), vec!["S", "r", "G", "m", "P", "d", "N"]);
        assert_eq!(raga.sargam_names()[1], "re");
        assert_eq!(raga.get_pitch_numbers(0, 11), vec![0, 1, 4, 5, 7, 8, 11]);
        assert_eq!(raga.pitch_number_to_sargam_letter(13).as_deref(), Some("r"));
        assert_eq!(raga.pitch_number_to_sargam_letter(2), None);
        assert_eq!(raga.pitch_number_to_scale_number(-1).unwrap(), -1);
        assert_eq!(raga.scale_number_to_pitch_number(7).unwrap(), 12);
        assert!(raga.pitch_number_to_scale_number(2).is_err());
    }

    #[test]
    fn test_get_pitches_in_range() {
        let raga = Raga::default();
        let pitches = raga.get_pitches(raga.fundamental, raga.fundamental * 1.999).unwrap();
        assert_eq!(pitches.len(), 7);
        assert!(pitches.windows(2).all(|w| w[0].frequency() < w[1].frequency()));
        let freqs = raga.get_frequencies(100.0, 800.0);
        assert!(freqs.iter().all(|f| (100.0..=800.0).contains(f)));
    }

    #[test]
    fn test_pitch_from_log_freq() {
        let raga = Raga::default();
        let target = Pitch::new(2, 1, true).unwrap();
        let p = raga.pitch_from_log_freq(target.log_freq() + 0.01).unwrap();
        assert_eq!(p.swara(), 2);
        assert_eq!(p.oct, 1);
        assert!(approx_eq!(f64, p.log_offset, 0.01, epsilon = 1e-9));
    }
}
