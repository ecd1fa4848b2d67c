use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::articulation::{canonical_key, position_key, Articulation, END_KEY, START_KEY};
use crate::automation::Automation;
use crate::error::{Result, SwaraError};
use crate::instrument::Instrument;
use crate::keys::decamelize;
use crate::phoneme;
use crate::pitch::Pitch;
use crate::uid::UniqueId;
use crate::util::starts;

/// Shape code of a trajectory; serialized as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Shape {
    #[default]
    Fixed = 0,
    Bend = 1,
    SlopedStart = 2,
    SlopedEnd = 3,
    Ladle = 4,
    ReverseLadle = 5,
    Yoyo = 6,
    Krintin = 7,
    KrintinSlide = 8,
    KrintinSlideHammer = 9,
    DenseKrintinSlideHammer = 10,
    Slide = 11,
    Silent = 12,
    Vibrato = 13,
}

impl Shape {
    pub const ALL: [Shape; 14] = [
        Shape::Fixed,
        Shape::Bend,
        Shape::SlopedStart,
        Shape::SlopedEnd,
        Shape::Ladle,
        Shape::ReverseLadle,
        Shape::Yoyo,
        Shape::Krintin,
        Shape::KrintinSlide,
        Shape::KrintinSlideHammer,
        Shape::DenseKrintinSlideHammer,
        Shape::Slide,
        Shape::Silent,
        Shape::Vibrato,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Fixed => "Fixed",
            Shape::Bend => "Bend: Simple",
            Shape::SlopedStart => "Bend: Sloped Start",
            Shape::SlopedEnd => "Bend: Sloped End",
            Shape::Ladle => "Bend: Ladle",
            Shape::ReverseLadle => "Bend: Reverse Ladle",
            Shape::Yoyo => "Bend: Simple Multiple",
            Shape::Krintin => "Krintin",
            Shape::KrintinSlide => "Krintin Slide",
            Shape::KrintinSlideHammer => "Krintin Slide Hammer",
            Shape::DenseKrintinSlideHammer => "Dense Krintin Slide Hammer",
            Shape::Slide => "Slide",
            Shape::Silent => "Silent",
            Shape::Vibrato => "Vibrato",
        }
    }

    pub fn is_sloped(&self) -> bool {
        matches!(
            self,
            Shape::SlopedStart | Shape::SlopedEnd | Shape::Ladle | Shape::ReverseLadle
        )
    }
}

impl TryFrom<u8> for Shape {
    type Error = SwaraError;

    fn try_from(id: u8) -> Result<Self> {
        Shape::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| SwaraError::InvalidValue(format!("invalid trajectory id: {}", id)))
    }
}

impl From<Shape> for u8 {
    fn from(shape: Shape) -> u8 {
        shape as u8
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct VibObj {
    pub periods: f64,
    #[serde(alias = "vertOffset")]
    pub vert_offset: f64,
    #[serde(alias = "initUp")]
    pub init_up: bool,
    pub extent: f64,
}

impl Default for VibObj {
    fn default() -> Self {
        VibObj {
            periods: 8.0,
            vert_offset: 0.0,
            init_up: true,
            extent: 0.05,
        }
    }
}

/// Key for pitch-duration aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchKey {
    Number(i32),
    Letter(String),
}

impl fmt::Display for PitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchKey::Number(n) => write!(f, "{}", n),
            PitchKey::Letter(s) => f.write_str(s),
        }
    }
}

/// Representation used to key fixed-pitch durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    #[default]
    PitchNumber,
    Chroma,
    ScaleDegree,
    SargamLetter,
}

impl OutputType {
    fn key(&self, pitch_number: i32) -> PitchKey {
        match self {
            OutputType::PitchNumber => PitchKey::Number(pitch_number),
            OutputType::Chroma => PitchKey::Number(Pitch::pitch_number_to_chroma(pitch_number) as i32),
            OutputType::ScaleDegree => {
                let chroma = Pitch::pitch_number_to_chroma(pitch_number);
                PitchKey::Number(Pitch::chroma_to_scale_degree(chroma).0 as i32)
            }
            OutputType::SargamLetter => PitchKey::Letter(
                Pitch::from_pitch_number(pitch_number, crate::pitch::DEFAULT_FUNDAMENTAL)
                    .sargam_letter(),
            ),
        }
    }
}

/// Start or end of a trajectory, where consonants attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

impl Edge {
    fn key(&self) -> &'static str {
        match self {
            Edge::Start => START_KEY,
            Edge::End => END_KEY,
        }
    }
}

/// Constructor input for [`Trajectory`], also the decoded (snake_case)
/// wire form. Absent fields take the shape's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrajectoryOptions {
    pub id: Option<Shape>,
    pub pitches: Option<Vec<Pitch>>,
    pub dur_tot: Option<f64>,
    pub dur_array: Option<Vec<f64>>,
    pub slope: Option<f64>,
    pub articulations: Option<BTreeMap<String, Articulation>>,
    pub num: Option<usize>,
    pub fund_id12: Option<f64>,
    pub vib_obj: Option<VibObj>,
    pub instrumentation: Option<Instrument>,
    pub vowel: Option<String>,
    pub vowel_ipa: Option<String>,
    pub vowel_hindi: Option<String>,
    pub vowel_eng_trans: Option<String>,
    pub start_consonant: Option<String>,
    pub start_consonant_hindi: Option<String>,
    pub start_consonant_ipa: Option<String>,
    pub start_consonant_eng_trans: Option<String>,
    pub end_consonant: Option<String>,
    pub end_consonant_hindi: Option<String>,
    pub end_consonant_ipa: Option<String>,
    pub end_consonant_eng_trans: Option<String>,
    pub group_id: Option<String>,
    pub automation: Option<Automation>,
    pub unique_id: Option<UniqueId>,
    pub tags: Option<Vec<String>>,
    pub start_time: Option<f64>,
}

/// One timed melodic movement over an ordered list of pitches.
///
/// `dur_array` holds the proportional split of `dur_tot`; its length is
/// tied to the shape (one entry per segment for bends, one per pitch for
/// krintin shapes). Articulations are keyed by a two-decimal position
/// string, see [`position_key`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Trajectory {
    pub id: Shape,
    pitches: Vec<Pitch>,
    pub dur_tot: f64,
    dur_array: Vec<f64>,
    pub slope: f64,
    articulations: BTreeMap<String, Articulation>,
    /// Phrase-relative start; assigned by the owning phrase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num: Option<usize>,
    name: &'static str,
    #[serde(rename = "fundID12", skip_serializing_if = "Option::is_none")]
    pub fund_id12: Option<f64>,
    pub vib_obj: VibObj,
    pub instrumentation: Instrument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vowel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vowel_ipa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vowel_hindi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vowel_eng_trans: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_consonant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_consonant_hindi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_consonant_ipa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_consonant_eng_trans: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_consonant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_consonant_hindi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_consonant_ipa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_consonant_eng_trans: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation: Option<Automation>,
    pub unique_id: UniqueId,
    pub tags: Vec<String>,
    #[serde(skip)]
    pub phrase_idx: Option<usize>,
    #[serde(skip)]
    freqs: Vec<f64>,
    #[serde(skip)]
    log_freqs: Vec<f64>,
}

impl Default for Trajectory {
    fn default() -> Self {
        // The default options always describe a valid fixed trajectory.
        Trajectory::build(TrajectoryOptions::default(), vec![Pitch::default()])
    }
}

impl Trajectory {
    pub fn new(mut opts: TrajectoryOptions) -> Result<Self> {
        let pitches = opts.pitches.take().unwrap_or_else(|| vec![Pitch::default()]);
        if pitches.is_empty() {
            return Err(SwaraError::InvalidValue(
                "a trajectory needs at least one pitch".to_string(),
            ));
        }
        Ok(Trajectory::build(opts, pitches))
    }

    /// A silent (id 12) trajectory holding `fundamental`, used as padding.
    pub fn silent(dur_tot: f64, fundamental: f64) -> Self {
        Trajectory::build(
            TrajectoryOptions {
                id: Some(Shape::Silent),
                dur_tot: Some(dur_tot),
                fund_id12: Some(fundamental),
                articulations: Some(BTreeMap::new()),
                ..Default::default()
            },
            vec![Pitch::default().with_fundamental(fundamental)],
        )
    }

    fn build(mut opts: TrajectoryOptions, mut pitches: Vec<Pitch>) -> Self {
        let id = opts.id.unwrap_or_default();
        let instrumentation = opts.instrumentation.unwrap_or_default();
        let mut articulations: BTreeMap<String, Articulation> = match opts.articulations.take() {
            Some(arts) => arts
                .into_iter()
                .map(|(k, a)| (canonical_key(&k), a))
                .collect(),
            None if instrumentation == Instrument::Sitar && id != Shape::Silent => {
                BTreeMap::from([(START_KEY.to_string(), Articulation::pluck("d"))])
            }
            None => BTreeMap::new(),
        };
        if let Some(c) = &opts.start_consonant {
            articulations.insert(
                START_KEY.to_string(),
                Articulation::consonant(
                    c,
                    opts.start_consonant_hindi.as_deref(),
                    opts.start_consonant_ipa.as_deref(),
                    opts.start_consonant_eng_trans.as_deref(),
                ),
            );
        }
        if let Some(c) = &opts.end_consonant {
            articulations.insert(
                END_KEY.to_string(),
                Articulation::consonant(
                    c,
                    opts.end_consonant_hindi.as_deref(),
                    opts.end_consonant_ipa.as_deref(),
                    opts.end_consonant_eng_trans.as_deref(),
                ),
            );
        }

        let log_freqs: Vec<f64> = pitches.iter().map(Pitch::log_freq).collect();
        let mut dur_array = default_dur_array(id, opts.dur_array.take(), pitches.len());
        let seg_starts = starts(&dur_array);
        let interior: &[&str] = match id {
            Shape::Krintin => {
                let rising = log_freqs.get(1).zip(log_freqs.first()).map_or(true, |(b, a)| b >= a);
                if rising {
                    &["hammer-on"]
                } else {
                    &["hammer-off"]
                }
            }
            Shape::KrintinSlide => &["hammer-off", "slide"],
            Shape::KrintinSlideHammer => &["hammer-off", "slide", "hammer-on"],
            Shape::DenseKrintinSlideHammer => {
                &["slide", "hammer-on", "hammer-off", "slide", "hammer-on"]
            }
            Shape::Slide => &["slide"],
            _ => &[],
        };
        for (name, start) in interior.iter().zip(seg_starts.iter().skip(1)) {
            articulations.insert(position_key(*start), Articulation::named(name));
        }

        prune_zero_durations(&mut dur_array, &mut pitches);

        if instrumentation.is_vocal() {
            articulations.retain(|_, a| a.name != "pluck");
        }

        let automation = match opts.automation.take() {
            Some(a) => Some(a),
            None if id == Shape::Silent => None,
            None => Some(Automation::default()),
        };

        let mut traj = Trajectory {
            id,
            pitches,
            dur_tot: opts.dur_tot.unwrap_or(1.0),
            dur_array,
            slope: opts.slope.unwrap_or(2.0),
            articulations,
            start_time: opts.start_time,
            num: opts.num,
            name: id.name(),
            fund_id12: opts.fund_id12,
            vib_obj: opts.vib_obj.unwrap_or_default(),
            instrumentation,
            vowel: opts.vowel,
            vowel_ipa: opts.vowel_ipa,
            vowel_hindi: opts.vowel_hindi,
            vowel_eng_trans: opts.vowel_eng_trans,
            start_consonant: opts.start_consonant,
            start_consonant_hindi: opts.start_consonant_hindi,
            start_consonant_ipa: opts.start_consonant_ipa,
            start_consonant_eng_trans: opts.start_consonant_eng_trans,
            end_consonant: opts.end_consonant,
            end_consonant_hindi: opts.end_consonant_hindi,
            end_consonant_ipa: opts.end_consonant_ipa,
            end_consonant_eng_trans: opts.end_consonant_eng_trans,
            group_id: opts.group_id,
            automation,
            unique_id: opts.unique_id.unwrap_or_default(),
            tags: opts.tags.unwrap_or_default(),
            phrase_idx: None,
            freqs: Vec::new(),
            log_freqs: Vec::new(),
        };
        traj.fill_phoneme_renderings();
        traj.refresh_freqs();
        traj
    }

    /// Decode a wire object in either key casing.
    pub fn from_value(value: Value) -> Result<Self> {
        let opts: TrajectoryOptions = serde_json::from_value(decamelize(value))?;
        Trajectory::new(opts)
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pitches(&self) -> &[Pitch] {
        &self.pitches
    }

    pub fn set_pitches(&mut self, pitches: Vec<Pitch>) -> Result<()> {
        if pitches.is_empty() {
            return Err(SwaraError::InvalidValue(
                "a trajectory needs at least one pitch".to_string(),
            ));
        }
        self.pitches = pitches;
        self.refresh_freqs();
        Ok(())
    }

    pub fn dur_array(&self) -> &[f64] {
        &self.dur_array
    }

    pub fn articulations(&self) -> &BTreeMap<String, Articulation> {
        &self.articulations
    }

    /// Articulation at a position given as a number or any numeric key.
    pub fn articulation(&self, key: &str) -> Option<&Articulation> {
        self.articulations.get(&canonical_key(key))
    }

    pub fn articulation_mut(&mut self, key: &str) -> Option<&mut Articulation> {
        self.articulations.get_mut(&canonical_key(key))
    }

    pub fn set_articulation(&mut self, x: f64, articulation: Articulation) {
        self.articulations.insert(position_key(x), articulation);
    }

    pub fn remove_articulation(&mut self, key: &str) -> Option<Articulation> {
        self.articulations.remove(&canonical_key(key))
    }

    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    pub fn log_freqs(&self) -> &[f64] {
        &self.log_freqs
    }

    fn refresh_freqs(&mut self) {
        self.freqs = self.pitches.iter().map(Pitch::frequency).collect();
        self.log_freqs = self.freqs.iter().map(|f| f.log2()).collect();
    }

    pub fn min_freq(&self) -> f64 {
        self.freqs.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_freq(&self) -> f64 {
        self.freqs.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_log_freq(&self) -> f64 {
        self.log_freqs.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_log_freq(&self) -> f64 {
        self.log_freqs.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn end_time(&self) -> Result<f64> {
        self.start_time
            .map(|s| s + self.dur_tot)
            .ok_or(SwaraError::Missing("trajectory start time"))
    }

    pub fn is_silent(&self) -> bool {
        self.id == Shape::Silent
    }

    /// Point every pitch at a new fundamental and refresh the cached
    /// frequencies.
    pub fn update_fundamental(&mut self, fundamental: f64) {
        for p in &mut self.pitches {
            p.fundamental = fundamental;
        }
        if self.is_silent() && self.fund_id12.is_some() {
            self.fund_id12 = Some(fundamental);
        }
        self.refresh_freqs();
    }

    /// Frequency at normalized position `x`; `log_scale` returns log2 of
    /// it instead.
    pub fn compute(&self, x: f64, log_scale: bool) -> Result<f64> {
        let lf = &self.log_freqs;
        let value = match self.id {
            Shape::Fixed => 2f64.powf(lf[0]),
            Shape::Bend => {
                self.require_pitches(2)?;
                bend(x, lf[0], lf[1])
            }
            Shape::SlopedStart => {
                self.require_pitches(2)?;
                approach(x, lf[0], lf[1], self.slope)
            }
            Shape::SlopedEnd => {
                self.require_pitches(2)?;
                depart(x, lf[0], lf[1], self.slope)
            }
            Shape::Ladle => {
                let d = self.split_point(3)?;
                if x < d[0] {
                    approach(x / d[0], lf[0], lf[1], self.slope)
                } else {
                    bend((x - d[0]) / d[1], lf[1], lf[2])
                }
            }
            Shape::ReverseLadle => {
                let d = self.split_point(3)?;
                if x < d[0] {
                    bend(x / d[0], lf[0], lf[1])
                } else {
                    depart((x - d[0]) / d[1], lf[1], lf[2], self.slope)
                }
            }
            Shape::Yoyo => self.multiple_bend(x)?,
            Shape::Krintin | Shape::Slide => {
                let d0 = self.dur_array.first().copied().unwrap_or(0.5);
                let idx = if x < d0 { 0 } else { 1 };
                2f64.powf(lf[idx.min(lf.len() - 1)])
            }
            Shape::KrintinSlide | Shape::KrintinSlideHammer | Shape::DenseKrintinSlideHammer => {
                let idx = self.segment_index(x, false)?;
                2f64.powf(lf[idx.min(lf.len() - 1)])
            }
            Shape::Silent => self.fund_id12.ok_or(SwaraError::Missing("fundID12"))?,
            Shape::Vibrato => self.vibrato(x),
        };
        Ok(if log_scale { value.log2() } else { value })
    }

    fn require_pitches(&self, n: usize) -> Result<()> {
        if self.pitches.len() < n {
            return Err(SwaraError::InvalidValue(format!(
                "{} needs {} pitches, has {}",
                self.id,
                n,
                self.pitches.len()
            )));
        }
        Ok(())
    }

    fn split_point(&self, n: usize) -> Result<[f64; 2]> {
        self.require_pitches(n)?;
        match self.dur_array.as_slice() {
            [a, b, ..] => Ok([*a, *b]),
            _ => Err(SwaraError::InvalidValue(format!(
                "{} needs two segment durations",
                self.id
            ))),
        }
    }

    /// Latest segment whose start is at or before `x`. With `open_end`
    /// the final boundary itself is out of range.
    fn segment_index(&self, x: f64, open_end: bool) -> Result<usize> {
        let seg_starts = starts(&self.dur_array);
        let end: f64 = self.dur_array.iter().sum();
        let past_end = if open_end { x >= end } else { x > end + 1e-9 };
        if x < 0.0 || past_end {
            warn!("invalid x for {}: {}", self.id, x);
            return Err(SwaraError::OutOfBounds { x, start: 0.0, end });
        }
        seg_starts
            .iter()
            .rposition(|&s| x >= s)
            .ok_or(SwaraError::OutOfBounds { x, start: 0.0, end })
    }

    fn multiple_bend(&self, x: f64) -> Result<f64> {
        let lf = &self.log_freqs;
        if lf.len() < 2 || self.dur_array.len() < lf.len() - 1 {
            return Err(SwaraError::InvalidValue(format!(
                "{} needs one segment per pitch pair",
                self.id
            )));
        }
        let idx = self.segment_index(x, true)?.min(lf.len() - 2);
        let offset: f64 = self.dur_array[..idx].iter().sum();
        Ok(bend((x - offset) / self.dur_array[idx], lf[idx], lf[idx + 1]))
    }

    fn vibrato(&self, x: f64) -> f64 {
        let VibObj {
            periods,
            mut vert_offset,
            init_up,
            extent,
        } = self.vib_obj;
        if vert_offset.abs() > extent / 2.0 {
            vert_offset = vert_offset.signum() * extent / 2.0;
        }
        let base = self.log_freqs[0];
        let half_period = 1.0 / (2.0 * periods);
        let init = if init_up { PI } else { 0.0 };
        let wave = |x: f64| (x * 2.0 * PI * periods + init).cos();
        let steady = |x: f64| wave(x) * extent / 2.0 + vert_offset + base;
        // Fade in over the first half period and out over the last.
        let faded = |from: f64, to: f64| {
            let middle = (from + to) / 2.0;
            let ext = (to - from).abs() / 2.0;
            2f64.powf(wave(x) * ext + middle)
        };
        if x < half_period {
            faded(base, steady(half_period))
        } else if x > 1.0 - half_period {
            faded(steady(1.0 - half_period), base)
        } else {
            2f64.powf(steady(x))
        }
    }

    /// Install a consonant at the start or end, with its renderings.
    pub fn add_consonant(&mut self, iso: &str, edge: Edge) {
        let (hindi, ipa, eng) = consonant_renderings(iso);
        self.set_consonant_fields(edge, Some(iso.to_string()), hindi, ipa, eng);
        self.articulations.insert(
            edge.key().to_string(),
            Articulation::consonant(iso, hindi, ipa, eng),
        );
    }

    /// Swap the consonant at an edge, keeping any other articulation data.
    pub fn change_consonant(&mut self, iso: &str, edge: Edge) {
        let (hindi, ipa, eng) = consonant_renderings(iso);
        self.set_consonant_fields(edge, Some(iso.to_string()), hindi, ipa, eng);
        match self.articulations.get_mut(edge.key()) {
            Some(art) => {
                art.stroke = Some(iso.to_string());
                art.hindi = hindi.map(str::to_string);
                art.ipa = ipa.map(str::to_string);
                art.eng_trans = eng.map(str::to_string);
            }
            None => {
                self.articulations.insert(
                    edge.key().to_string(),
                    Articulation::consonant(iso, hindi, ipa, eng),
                );
            }
        }
    }

    pub fn remove_consonant(&mut self, edge: Edge) {
        self.set_consonant_fields(edge, None, None, None, None);
        if self
            .articulations
            .get(edge.key())
            .map_or(false, Articulation::is_consonant)
        {
            self.articulations.remove(edge.key());
        }
    }

    pub fn update_vowel(&mut self, iso: &str) {
        let found = phoneme::vowel(iso);
        if found.is_none() {
            warn!("unknown vowel: {}", iso);
        }
        self.vowel = Some(iso.to_string());
        self.vowel_hindi = found.map(|p| p.hindi.to_string());
        self.vowel_ipa = found.map(|p| p.ipa.to_string());
        self.vowel_eng_trans = found.map(|p| p.eng_trans.to_string());
    }

    fn set_consonant_fields(
        &mut self,
        edge: Edge,
        iso: Option<String>,
        hindi: Option<&str>,
        ipa: Option<&str>,
        eng: Option<&str>,
    ) {
        let fields = match edge {
            Edge::Start => (
                &mut self.start_consonant,
                &mut self.start_consonant_hindi,
                &mut self.start_consonant_ipa,
                &mut self.start_consonant_eng_trans,
            ),
            Edge::End => (
                &mut self.end_consonant,
                &mut self.end_consonant_hindi,
                &mut self.end_consonant_ipa,
                &mut self.end_consonant_eng_trans,
            ),
        };
        *fields.0 = iso;
        *fields.1 = hindi.map(str::to_string);
        *fields.2 = ipa.map(str::to_string);
        *fields.3 = eng.map(str::to_string);
    }

    /// Fill Hindi, IPA and English renderings that are missing from
    /// consonant articulations and the consonant/vowel text fields.
    fn fill_phoneme_renderings(&mut self) {
        for art in self.articulations.values_mut().filter(|a| a.is_consonant()) {
            let Some(iso) = art.stroke.as_deref() else {
                continue;
            };
            let (hindi, ipa, eng) = consonant_renderings(iso);
            fill(&mut art.hindi, hindi);
            fill(&mut art.ipa, ipa);
            fill(&mut art.eng_trans, eng);
        }
        if let Some(iso) = self.start_consonant.clone() {
            let (hindi, ipa, eng) = consonant_renderings(&iso);
            fill(&mut self.start_consonant_hindi, hindi);
            fill(&mut self.start_consonant_ipa, ipa);
            fill(&mut self.start_consonant_eng_trans, eng);
        }
        if let Some(iso) = self.end_consonant.clone() {
            let (hindi, ipa, eng) = consonant_renderings(&iso);
            fill(&mut self.end_consonant_hindi, hindi);
            fill(&mut self.end_consonant_ipa, ipa);
            fill(&mut self.end_consonant_eng_trans, eng);
        }
        if let Some(iso) = self.vowel.clone() {
            match phoneme::vowel(&iso) {
                Some(v) => {
                    fill(&mut self.vowel_hindi, Some(v.hindi));
                    fill(&mut self.vowel_ipa, Some(v.ipa));
                    fill(&mut self.vowel_eng_trans, Some(v.eng_trans));
                }
                None => warn!("unknown vowel: {}", iso),
            }
        }
    }

    /// Time spent on each held pitch, keyed by `output`.
    ///
    /// Bends only count when their endpoints coincide; krintin shapes count
    /// every pitch for its own segment.
    pub fn durations_of_fixed_pitches(&self, output: OutputType) -> Result<BTreeMap<PitchKey, f64>> {
        let nums: Vec<i32> = self.pitches.iter().map(Pitch::numbered_pitch).collect();
        let malformed = |what: &str| {
            SwaraError::Format(format!("{} is missing {}", self.id, what))
        };
        let mut by_number: Vec<(i32, f64)> = Vec::new();
        match self.id {
            Shape::Fixed | Shape::Vibrato => by_number.push((nums[0], self.dur_tot)),
            Shape::Bend | Shape::SlopedStart | Shape::SlopedEnd => {
                let pair = nums.get(..2).ok_or_else(|| malformed("a second pitch"))?;
                if pair[0] == pair[1] {
                    by_number.push((pair[0], self.dur_tot));
                }
            }
            Shape::Ladle | Shape::ReverseLadle => {
                let p = nums.get(..3).ok_or_else(|| malformed("a third pitch"))?;
                let d = self
                    .dur_array
                    .get(..2)
                    .ok_or_else(|| malformed("segment durations"))?;
                if p[0] == p[1] {
                    by_number.push((p[0], self.dur_tot * d[0]));
                } else if p[1] == p[2] {
                    by_number.push((p[1], self.dur_tot * d[1]));
                }
            }
            Shape::Yoyo => {
                for i in 1..nums.len() {
                    if nums[i] == nums[i - 1] {
                        let d = self
                            .dur_array
                            .get(i - 1)
                            .ok_or_else(|| malformed("segment durations"))?;
                        by_number.push((nums[i], self.dur_tot * d));
                    }
                }
            }
            Shape::Krintin
            | Shape::KrintinSlide
            | Shape::KrintinSlideHammer
            | Shape::DenseKrintinSlideHammer
            | Shape::Slide => {
                for (num, d) in nums.iter().zip(&self.dur_array) {
                    by_number.push((*num, self.dur_tot * d));
                }
            }
            Shape::Silent => {}
        }
        let mut out = BTreeMap::new();
        for (num, dur) in by_number {
            *out.entry(output.key(num)).or_insert(0.0) += dur;
        }
        Ok(out)
    }
}

impl<'de> Deserialize<'de> for Trajectory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Trajectory::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn default_dur_array(id: Shape, supplied: Option<Vec<f64>>, pitch_count: usize) -> Vec<f64> {
    let uniform = |n: usize| vec![1.0 / n as f64; n];
    match (id, supplied) {
        (Shape::Fixed | Shape::Bend | Shape::SlopedStart | Shape::SlopedEnd, _) => vec![1.0],
        (Shape::Slide, Some(d)) if d.len() == 1 => vec![0.5, 0.5],
        (_, Some(d)) => d,
        (Shape::Ladle, None) => vec![1.0 / 3.0, 2.0 / 3.0],
        (Shape::ReverseLadle, None) => vec![2.0 / 3.0, 1.0 / 3.0],
        (Shape::Yoyo, None) => uniform(pitch_count.saturating_sub(1)),
        (Shape::Krintin, None) => vec![0.2, 0.8],
        (Shape::KrintinSlide, None) => uniform(3),
        (Shape::KrintinSlideHammer, None) => uniform(4),
        (Shape::DenseKrintinSlideHammer, None) => uniform(6),
        (Shape::Slide, None) => vec![0.5, 0.5],
        (Shape::Silent | Shape::Vibrato, None) => vec![1.0],
    }
}

/// Drop zero-length entries with the pitch each one introduces: entry `i`
/// of a per-pitch array introduces pitch `i`, entry `i` of a segment array
/// introduces pitch `i + 1`.
fn prune_zero_durations(dur_array: &mut Vec<f64>, pitches: &mut Vec<Pitch>) {
    let per_pitch = dur_array.len() == pitches.len();
    let mut i = 0;
    while i < dur_array.len() {
        if dur_array[i] != 0.0 {
            i += 1;
            continue;
        }
        dur_array.remove(i);
        let pitch_idx = if per_pitch { i } else { i + 1 };
        if pitch_idx < pitches.len() && pitches.len() > 1 {
            pitches.remove(pitch_idx);
        }
        debug!("removed zero-duration segment {}", i);
    }
}

fn consonant_renderings(iso: &str) -> (Option<&'static str>, Option<&'static str>, Option<&'static str>) {
    match phoneme::consonant(iso) {
        Some(p) => (Some(p.hindi), Some(p.ipa), Some(p.eng_trans)),
        None => {
            warn!("unknown consonant: {}", iso);
            (None, None, None)
        }
    }
}

fn fill(field: &mut Option<String>, value: Option<&str>) {
    if field.as_deref().map_or(true, str::is_empty) {
        if let Some(v) = value {
            *field = Some(v.to_string());
        }
    }
}

/// Half-cosine interpolation in log-frequency space. The easing keeps the
/// endpoints of a linear log-frequency ramp and flattens its ends.
fn bend(x: f64, from: f64, to: f64) -> f64 {
    let pi_x = (PI * (x + 1.0)).cos() / 2.0 + 0.5;
    2f64.powf(pi_x * (to - from) + from)
}

fn approach(x: f64, from: f64, to: f64, slope: f64) -> f64 {
    2f64.powf((from - to) * (1.0 - x).powf(slope) + to)
}

fn depart(x: f64, from: f64, to: f64, slope: f64) -> f64 {
    2f64.powf((to - from) * x.powf(slope) + from)
}
