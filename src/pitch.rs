use serde::{Deserialize, Serialize};

use crate::error::{Result, SwaraError};

pub const DEFAULT_FUNDAMENTAL: f64 = 261.63;

const SARGAM: [&str; 7] = ["sa", "re", "ga", "ma", "pa", "dha", "ni"];
const SOLFEGE: [&str; 12] = [
    "Do", "Ra", "Re", "Me", "Mi", "Fa", "Fi", "Sol", "Le", "La", "Te", "Ti",
];
const WESTERN: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Ratio table entry for one scale degree.
///
/// Sa and pa have a single ratio; every other degree carries a
/// `[lowered, raised]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ratio {
    Fixed(f64),
    Variants([f64; 2]),
}

/// Twelve-tone equal temperament, laid out as a seven-degree ratio table.
pub fn default_ratios() -> Vec<Ratio> {
    let et = |n: i32| 2f64.powf(n as f64 / 12.0);
    vec![
        Ratio::Fixed(et(0)),
        Ratio::Variants([et(1), et(2)]),
        Ratio::Variants([et(3), et(4)]),
        Ratio::Variants([et(5), et(6)]),
        Ratio::Fixed(et(7)),
        Ratio::Variants([et(8), et(9)]),
        Ratio::Variants([et(10), et(11)]),
    ]
}

/// Constructor input for [`Pitch`]; absent fields take the defaults.
#[derive(Debug, Clone, Default)]
pub struct PitchOptions {
    pub swara: Option<u8>,
    pub oct: Option<i32>,
    pub raised: Option<bool>,
    pub fundamental: Option<f64>,
    pub ratios: Option<Vec<Ratio>>,
    pub log_offset: Option<f64>,
}

/// A single pitch: scale degree, octave and raised/lowered flag resolved
/// against a ratio table and a fundamental.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"), try_from = "PitchDocument")]
pub struct Pitch {
    swara: u8,
    raised: bool,
    pub oct: i32,
    ratios: Vec<Ratio>,
    pub fundamental: f64,
    /// Offset from the tuned pitch, in octaves.
    pub log_offset: f64,
}

impl Default for Pitch {
    fn default() -> Self {
        Pitch {
            swara: 0,
            raised: true,
            oct: 0,
            ratios: default_ratios(),
            fundamental: DEFAULT_FUNDAMENTAL,
            log_offset: 0.0,
        }
    }
}

impl Pitch {
    /// Build a pitch from a scale degree (0 = sa … 6 = ni) with default
    /// tuning.
    pub fn new(swara: u8, oct: i32, raised: bool) -> Result<Self> {
        Self::from_options(PitchOptions {
            swara: Some(swara),
            oct: Some(oct),
            raised: Some(raised),
            ..Default::default()
        })
    }

    /// Build a pitch from a sargam name (`"ga"`) or initial (`"g"`).
    pub fn from_sargam(name: &str, oct: i32, raised: bool) -> Result<Self> {
        Self::new(swara_from_name(name)?, oct, raised)
    }

    pub fn from_options(opts: PitchOptions) -> Result<Self> {
        let swara = opts.swara.unwrap_or(0);
        if swara as usize >= SARGAM.len() {
            return Err(SwaraError::InvalidValue(format!(
                "invalid swara number: {}",
                swara
            )));
        }
        let ratios = opts.ratios.unwrap_or_else(default_ratios);
        validate_ratios(&ratios)?;
        let fundamental = opts.fundamental.unwrap_or(DEFAULT_FUNDAMENTAL);
        if !fundamental.is_finite() {
            return Err(SwaraError::InvalidValue(format!(
                "invalid fundamental: {}",
                fundamental
            )));
        }
        // Sa and pa have no lowered form.
        let raised = swara == 0 || swara == 4 || opts.raised.unwrap_or(true);
        Ok(Pitch {
            swara,
            raised,
            oct: opts.oct.unwrap_or(0),
            ratios,
            fundamental,
            log_offset: opts.log_offset.unwrap_or(0.0),
        })
    }

    pub fn with_fundamental(mut self, fundamental: f64) -> Self {
        self.fundamental = fundamental;
        self
    }

    pub fn with_ratios(mut self, ratios: Vec<Ratio>) -> Result<Self> {
        self.set_ratios(ratios)?;
        Ok(self)
    }

    pub fn with_log_offset(mut self, log_offset: f64) -> Self {
        self.log_offset = log_offset;
        self
    }

    /// Pitch for a 0-centred semitone number, e.g. `-1` is ni one octave
    /// down.
    pub fn from_pitch_number(pitch_number: i32, fundamental: f64) -> Self {
        let oct = pitch_number.div_euclid(12);
        let (swara, raised) = Self::chroma_to_scale_degree(Self::pitch_number_to_chroma(pitch_number));
        Pitch {
            swara,
            raised,
            oct,
            fundamental,
            ..Default::default()
        }
    }

    pub fn pitch_number_to_chroma(pitch_number: i32) -> u8 {
        pitch_number.rem_euclid(12) as u8
    }

    /// Scale degree and raised flag for a chroma; lowered forms are
    /// preferred for the black keys.
    pub fn chroma_to_scale_degree(chroma: u8) -> (u8, bool) {
        match chroma % 12 {
            0 => (0, true),
            1 => (1, false),
            2 => (1, true),
            3 => (2, false),
            4 => (2, true),
            5 => (3, false),
            6 => (3, true),
            7 => (4, true),
            8 => (5, false),
            9 => (5, true),
            10 => (6, false),
            _ => (6, true),
        }
    }

    pub fn swara(&self) -> u8 {
        self.swara
    }

    pub fn raised(&self) -> bool {
        self.raised
    }

    pub fn ratios(&self) -> &[Ratio] {
        &self.ratios
    }

    pub fn set_ratios(&mut self, ratios: Vec<Ratio>) -> Result<()> {
        validate_ratios(&ratios)?;
        self.ratios = ratios;
        Ok(())
    }

    fn ratio(&self) -> f64 {
        match self.ratios[self.swara as usize] {
            Ratio::Fixed(r) => r,
            Ratio::Variants(pair) => pair[self.raised as usize],
        }
    }

    pub fn frequency(&self) -> f64 {
        self.non_offset_frequency() * 2f64.powf(self.log_offset)
    }

    pub fn non_offset_frequency(&self) -> f64 {
        self.ratio() * self.fundamental * 2f64.powi(self.oct)
    }

    pub fn log_freq(&self) -> f64 {
        self.frequency().log2()
    }

    pub fn non_offset_log_freq(&self) -> f64 {
        self.non_offset_frequency().log2()
    }

    /// Semitones above the central sa, like a MIDI number centred on 0.
    pub fn numbered_pitch(&self) -> i32 {
        let raised = self.raised as i32;
        let base = match self.swara {
            0 => 0,
            1 => 1 + raised,
            2 => 3 + raised,
            3 => 5 + raised,
            4 => 7,
            5 => 8 + raised,
            _ => 10 + raised,
        };
        self.oct * 12 + base
    }

    pub fn chroma(&self) -> u8 {
        Self::pitch_number_to_chroma(self.numbered_pitch())
    }

    pub fn scale_degree(&self) -> u8 {
        self.swara + 1
    }

    pub fn sargam_letter(&self) -> String {
        let letter = &SARGAM[self.swara as usize][..1];
        if self.raised {
            letter.to_uppercase()
        } else {
            letter.to_string()
        }
    }

    pub fn octaved_sargam_letter(&self) -> String {
        self.sargam_letter() + octave_mark(self.oct)
    }

    pub fn octaved_scale_degree(&self) -> String {
        self.scale_degree().to_string() + octave_mark(self.oct)
    }

    pub fn solfege_letter(&self) -> &'static str {
        SOLFEGE[self.chroma() as usize]
    }

    pub fn western_pitch(&self) -> &'static str {
        WESTERN[self.chroma() as usize]
    }

    /// Deviation from the equal-tempered pitch of the same chroma, e.g.
    /// `"+14¢"`.
    pub fn cents_string(&self) -> String {
        let et_freq =
            self.fundamental * 2f64.powf(self.chroma() as f64 / 12.0) * 2f64.powi(self.oct);
        let cents = 1200.0 * (self.frequency() / et_freq).log2();
        let sign = if cents >= 0.0 { '+' } else { '-' };
        format!("{}{}\u{00A2}", sign, cents.abs().round())
    }

    pub fn same_as(&self, other: &Pitch) -> bool {
        self.swara == other.swara && self.oct == other.oct && self.raised == other.raised
    }
}

fn octave_mark(oct: i32) -> &'static str {
    match oct {
        -3 => "\u{20E8}",
        -2 => "\u{0324}",
        -1 => "\u{0323}",
        1 => "\u{0307}",
        2 => "\u{0308}",
        3 => "\u{20DB}",
        _ => "",
    }
}

pub(crate) fn swara_from_name(name: &str) -> Result<u8> {
    let lower = name.to_lowercase();
    let found = if lower.chars().count() == 1 {
        SARGAM.iter().position(|s| s.starts_with(lower.as_str()))
    } else {
        SARGAM.iter().position(|s| *s == lower)
    };
    found
        .map(|idx| idx as u8)
        .ok_or_else(|| SwaraError::InvalidValue(format!("invalid swara string: {:?}", name)))
}

fn validate_ratios(ratios: &[Ratio]) -> Result<()> {
    if ratios.len() != SARGAM.len() {
        return Err(SwaraError::InvalidValue(format!(
            "ratio table must have {} entries, got {}",
            SARGAM.len(),
            ratios.len()
        )));
    }
    for (idx, ratio) in ratios.iter().enumerate() {
        let fixed_slot = idx == 0 || idx == 4;
        match (fixed_slot, ratio) {
            (true, Ratio::Fixed(_)) | (false, Ratio::Variants(_)) => {}
            _ => {
                return Err(SwaraError::InvalidValue(format!(
                    "ratio for {} has the wrong form: {:?}",
                    SARGAM[idx], ratio
                )))
            }
        }
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SwaraInput {
    Degree(i64),
    Name(String),
}

#[derive(Deserialize)]
struct PitchDocument {
    #[serde(default)]
    swara: Option<SwaraInput>,
    #[serde(default)]
    raised: Option<bool>,
    #[serde(default)]
    oct: Option<i32>,
    #[serde(default)]
    ratios: Option<Vec<Ratio>>,
    #[serde(default)]
    fundamental: Option<f64>,
    #[serde(default, alias = "logOffset")]
    log_offset: Option<f64>,
}

impl TryFrom<PitchDocument> for Pitch {
    type Error = SwaraError;

    fn try_from(doc: PitchDocument) -> Result<Self> {
        let swara = match doc.swara {
            None => None,
            Some(SwaraInput::Degree(n)) => Some(u8::try_from(n).map_err(|_| {
                SwaraError::InvalidValue(format!("invalid swara number: {}", n))
            })?),
            Some(SwaraInput::Name(name)) => Some(swara_from_name(&name)?),
        };
        Pitch::from_options(PitchOptions {
            swara,
            oct: doc.oct,
            raised: doc.raised,
            fundamental: doc.fundamental,
            ratios: doc.ratios,
            log_offset: doc.log_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use serde_json::json;

    #[test]
    fn test_default_pitch() {
        let p = Pitch::default();
        assert_eq!(p.swara(), 0);
        assert!(p.raised());
        assert!(approx_eq!(f64, p.frequency(), 261.63, ulps = 4));
        assert_eq!(p.sargam_letter(), "S");
        assert_eq!(p.numbered_pitch(), 0);
        assert_eq!(p.solfege_letter(), "Do");
        assert_eq!(p.cents_string(), "+0\u{00A2}");
    }

    #[test]
    fn test_lowered_re_frequency() {
        let p = Pitch::new(1, 0, false).unwrap();
        let expected = 261.63 * 2f64.powf(1.0 / 12.0);
        assert!(approx_eq!(f64, p.frequency(), expected, epsilon = 1e-9));
        assert_eq!(p.sargam_letter(), "r");
        assert_eq!(p.numbered_pitch(), 1);
        assert_eq!(p.western_pitch(), "C#");
    }

    #[test]
    fn test_sa_and_pa_are_always_raised() {
        assert!(Pitch::new(0, 0, false).unwrap().raised());
        assert!(Pitch::new(4, 1, false).unwrap().raised());
    }

    #[test]
    fn test_octave_and_log_offset() {
        let p = Pitch::new(4, 1, true).unwrap().with_log_offset(0.5);
        assert_eq!(p.numbered_pitch(), 19);
        assert_eq!(p.octaved_sargam_letter(), "P\u{0307}");
        let expected = p.non_offset_frequency() * 2f64.sqrt();
        assert!(approx_eq!(f64, p.frequency(), expected, epsilon = 1e-9));
    }

    #[test]
    fn test_from_pitch_number_negative() {
        let p = Pitch::from_pitch_number(-1, DEFAULT_FUNDAMENTAL);
        assert_eq!(p.swara(), 6);
        assert!(p.raised());
        assert_eq!(p.oct, -1);
        assert_eq!(p.numbered_pitch(), -1);
        assert_eq!(Pitch::pitch_number_to_chroma(-13), 11);
    }

    #[test]
    fn test_sargam_names() {
        assert_eq!(Pitch::from_sargam("dha", 0, true).unwrap().swara(), 5);
        assert_eq!(Pitch::from_sargam("G", 0, true).unwrap().swara(), 2);
        assert!(Pitch::from_sargam("x", 0, true).is_err());
        assert!(Pitch::from_sargam("rex", 0, true).is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(Pitch::new(7, 0, true).is_err());
        assert!(Pitch::default().with_ratios(vec![Ratio::Fixed(1.0)]).is_err());
        let mut bad = default_ratios();
        bad[1] = Ratio::Fixed(1.1);
        assert!(Pitch::default().with_ratios(bad).is_err());
    }

    #[test]
    fn test_json_accepts_names_and_both_casings() {
        let p: Pitch = serde_json::from_value(json!({
            "swara": "ga", "raised": false, "oct": -1, "logOffset": 0.01
        }))
        .unwrap();
        assert_eq!(p.swara(), 2);
        assert!(!p.raised());
        assert_eq!(p.log_offset, 0.01);

        let snake: Pitch = serde_json::from_value(json!({ "swara": 3, "log_offset": 0.02 })).unwrap();
        assert_eq!(snake.log_offset, 0.02);

        let out = serde_json::to_value(&p).unwrap();
        assert_eq!(out["swara"], json!(2));
        assert_eq!(out["logOffset"], json!(0.01));
        assert_eq!(out["ratios"][0], json!(1.0));
    }
}
