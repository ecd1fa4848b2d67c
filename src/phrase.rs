use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::chikari::{Chikari, ChikariDisplay};
use crate::error::{Result, SwaraError};
use crate::group::{Group, GroupView};
use crate::instrument::Instrument;
use crate::pitch::Pitch;
use crate::raga::Raga;
use crate::trajectory::Trajectory;
use crate::uid::UniqueId;
use crate::util::starts;

/// Category → label → flag.
pub type PhraseCategorization = BTreeMap<String, BTreeMap<String, bool>>;

const PHRASE_CATEGORIES: [(&str, &[&str]); 5] = [
    (
        "Phrase",
        &["Mohra", "Mukra", "Asthai", "Antara", "Manjha", "Abhog", "Sanchari", "Jhala"],
    ),
    (
        "Elaboration",
        &[
            "Vistar",
            "Barhat",
            "Prastar",
            "Bol Banao",
            "Bol Alap",
            "Bol Bandt",
            "Behlava",
            "Gat-kari",
            "Tan (Sapat)",
            "Tan (Gamak)",
            "Laykari",
            "Tihai",
            "Chakradar",
        ],
    ),
    (
        "Vocal Articulation",
        &["Bol", "Non-Tom", "Tarana", "Aakar", "Sargam"],
    ),
    ("Instrumental Articulation", &["Bol", "Non-Bol"]),
    (
        "Incidental",
        &["Talk/Conversation", "Praise ('Vah')", "Tuning", "Pause"],
    ),
];

/// Every phrase category with all labels unset.
pub fn init_phrase_categorization() -> PhraseCategorization {
    PHRASE_CATEGORIES
        .iter()
        .map(|(cat, labels)| {
            let flags = labels.iter().map(|l| (l.to_string(), false)).collect();
            (cat.to_string(), flags)
        })
        .collect()
}

/// Constructor input for [`Phrase`].
#[derive(Debug, Clone, Default)]
pub struct PhraseOptions {
    pub trajectories: Option<Vec<Trajectory>>,
    pub trajectory_grid: Option<Vec<Vec<Trajectory>>>,
    pub dur_tot: Option<f64>,
    pub dur_array: Option<Vec<f64>>,
    pub chikaris: Option<BTreeMap<String, Chikari>>,
    pub chikari_grid: Option<Vec<BTreeMap<String, Chikari>>>,
    pub raga: Option<Rc<Raga>>,
    pub start_time: Option<f64>,
    pub instrumentation: Option<Vec<Instrument>>,
    pub categorization_grid: Option<Vec<PhraseCategorization>>,
    pub ad_hoc_categorization_grid: Option<Vec<String>>,
    pub unique_id: Option<UniqueId>,
    pub piece_idx: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitchRange {
    pub min: Pitch,
    pub max: Pitch,
}

/// A pitch and the absolute time it sounds.
#[derive(Debug, Clone, PartialEq)]
pub struct SwaraEvent {
    pub pitch: Pitch,
    pub time: f64,
}

/// The pitches of a phrase without their trajectory shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteViewPhrase {
    pub pitches: Vec<Pitch>,
    pub dur_tot: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raga: Option<Rc<Raga>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
}

/// An ordered run of trajectories forming one musical utterance.
///
/// The phrase owns its trajectories. `dur_tot` and `dur_array` are derived
/// from them by [`Phrase::recompute`], which callers invoke after any
/// structural edit; `start_time` and `piece_idx` are assigned by the
/// owning piece.
#[derive(Debug, Clone, PartialEq)]
pub struct Phrase {
    trajectory_grid: Vec<Vec<Trajectory>>,
    pub chikari_grid: Vec<BTreeMap<String, Chikari>>,
    groups_grid: Vec<Vec<Group>>,
    pub instrumentation: Vec<Instrument>,
    pub dur_tot: f64,
    pub dur_array: Vec<f64>,
    pub start_time: Option<f64>,
    pub raga: Option<Rc<Raga>>,
    pub piece_idx: Option<usize>,
    pub categorization_grid: Vec<PhraseCategorization>,
    pub ad_hoc_categorization_grid: Vec<String>,
    pub unique_id: UniqueId,
}

impl Default for Phrase {
    fn default() -> Self {
        Phrase::new(PhraseOptions::default())
    }
}

impl Phrase {
    /// A `dur_tot` or `dur_array` that disagrees with the trajectories
    /// rescales the trajectories to match.
    pub fn new(opts: PhraseOptions) -> Self {
        Phrase::assemble(opts, true)
    }

    pub fn from_trajectories(trajectories: Vec<Trajectory>) -> Self {
        Phrase::new(PhraseOptions {
            trajectories: Some(trajectories),
            ..Default::default()
        })
    }

    fn assemble(opts: PhraseOptions, rescale: bool) -> Self {
        let mut instrumentation = opts.instrumentation.unwrap_or_default();
        if instrumentation.is_empty() {
            instrumentation.push(Instrument::Sitar);
        }
        let tracks = instrumentation.len();
        let mut trajectory_grid = match opts.trajectory_grid {
            Some(grid) => grid,
            None => vec![opts.trajectories.unwrap_or_default()],
        };
        trajectory_grid.resize_with(tracks, Vec::new);
        let mut chikari_grid = match opts.chikari_grid {
            Some(grid) => grid,
            None => vec![opts.chikaris.unwrap_or_default()],
        };
        chikari_grid.resize_with(tracks, BTreeMap::new);

        let mut categorization_grid = opts.categorization_grid.unwrap_or_default();
        if categorization_grid.is_empty() {
            categorization_grid = (0..tracks).map(|_| init_phrase_categorization()).collect();
        }
        for cat in &mut categorization_grid {
            if let Some(elaboration) = cat.get_mut("Elaboration") {
                elaboration.entry("Bol Alap".to_string()).or_insert(false);
            }
        }

        let mut phrase = Phrase {
            trajectory_grid,
            chikari_grid,
            groups_grid: vec![Vec::new(); tracks],
            instrumentation,
            dur_tot: 0.0,
            dur_array: Vec::new(),
            start_time: opts.start_time,
            raga: opts.raga,
            piece_idx: opts.piece_idx,
            categorization_grid,
            ad_hoc_categorization_grid: opts.ad_hoc_categorization_grid.unwrap_or_default(),
            unique_id: opts.unique_id.unwrap_or_default(),
        };

        if phrase.trajectories().is_empty() {
            phrase.dur_tot = opts.dur_tot.unwrap_or(0.0);
        } else {
            phrase.recompute();
            if rescale {
                phrase.rescale(opts.dur_tot, opts.dur_array);
            }
        }
        phrase.assign_start_times();
        phrase.assign_traj_nums();
        phrase
    }

    fn rescale(&mut self, dur_tot: Option<f64>, dur_array: Option<Vec<f64>>) {
        if let Some(target) = dur_tot {
            if target != self.dur_tot && self.dur_tot > 0.0 {
                let factor = target / self.dur_tot;
                for t in self.trajectories_mut() {
                    t.dur_tot *= factor;
                }
                self.recompute();
            }
        }
        if let Some(target) = dur_array {
            if target != self.dur_array && target.len() == self.dur_array.len() {
                let current = self.dur_array.clone();
                for ((t, want), have) in self.trajectory_grid[0].iter_mut().zip(&target).zip(&current) {
                    if *have > 0.0 {
                        t.dur_tot *= want / have;
                    }
                }
                self.recompute();
            }
        }
    }

    pub fn trajectories(&self) -> &[Trajectory] {
        &self.trajectory_grid[0]
    }

    /// Direct access for structural edits; call [`Phrase::reset`] after.
    pub fn trajectories_mut(&mut self) -> &mut Vec<Trajectory> {
        &mut self.trajectory_grid[0]
    }

    pub fn trajectory_grid(&self) -> &[Vec<Trajectory>] {
        &self.trajectory_grid
    }

    pub fn chikaris(&self) -> &BTreeMap<String, Chikari> {
        &self.chikari_grid[0]
    }

    pub fn chikaris_mut(&mut self) -> &mut BTreeMap<String, Chikari> {
        &mut self.chikari_grid[0]
    }

    /// Sum trajectory durations and derive the proportional array; all
    /// zeros when the total is zero.
    pub fn recompute(&mut self) {
        self.dur_tot = self.trajectories().iter().map(|t| t.dur_tot).sum();
        let total = self.dur_tot;
        self.dur_array = self
            .trajectories()
            .iter()
            .map(|t| if total == 0.0 { 0.0 } else { t.dur_tot / total })
            .collect();
    }

    pub fn assign_start_times(&mut self) {
        let total = self.dur_tot;
        let offsets = starts(&self.dur_array);
        for (t, s) in self.trajectory_grid[0].iter_mut().zip(offsets) {
            t.start_time = Some(s * total);
        }
    }

    pub fn assign_traj_nums(&mut self) {
        for (i, t) in self.trajectories_mut().iter_mut().enumerate() {
            t.num = Some(i);
        }
    }

    pub fn assign_phrase_idx(&mut self) {
        let idx = self.piece_idx;
        for t in self.trajectories_mut() {
            t.phrase_idx = idx;
        }
    }

    pub fn reset(&mut self) {
        self.recompute();
        self.assign_start_times();
        self.assign_phrase_idx();
        self.assign_traj_nums();
    }

    pub fn push_trajectory(&mut self, trajectory: Trajectory) {
        self.trajectories_mut().push(trajectory);
    }

    pub fn insert_trajectory(&mut self, idx: usize, trajectory: Trajectory) -> Result<()> {
        if idx > self.trajectories().len() {
            return Err(SwaraError::InvalidValue(format!(
                "insert position {} past the end of {} trajectories",
                idx,
                self.trajectories().len()
            )));
        }
        self.trajectories_mut().insert(idx, trajectory);
        self.remap_groups(|n| Some(if n >= idx { n + 1 } else { n }));
        Ok(())
    }

    pub fn remove_trajectory(&mut self, idx: usize) -> Result<Trajectory> {
        if idx >= self.trajectories().len() {
            return Err(SwaraError::not_found("trajectory", idx.to_string()));
        }
        let removed = self.trajectories_mut().remove(idx);
        self.remap_groups(|n| match n {
            n if n == idx => None,
            n if n > idx => Some(n - 1),
            n => Some(n),
        });
        Ok(removed)
    }

    fn remap_groups(&mut self, map: impl Fn(usize) -> Option<usize> + Copy) {
        let mut dissolved = Vec::new();
        for groups in &mut self.groups_grid {
            let mut kept = Vec::with_capacity(groups.len());
            for g in groups.drain(..) {
                match g.remap(map) {
                    Some(remapped) => kept.push(remapped),
                    None => dissolved.push(g.id.to_string()),
                }
            }
            *groups = kept;
        }
        for t in self.trajectories_mut() {
            if t.group_id.as_ref().map_or(false, |id| dissolved.contains(id)) {
                t.group_id = None;
            }
        }
    }

    /// Frequency at normalized position `x`; `None` for a phrase with no
    /// trajectories.
    pub fn compute(&self, x: f64, log_scale: bool) -> Result<Option<f64>> {
        if self.dur_array.is_empty() {
            return Ok(None);
        }
        let offsets = starts(&self.dur_array);
        let idx = offsets
            .iter()
            .rposition(|&s| x >= s)
            .ok_or(SwaraError::OutOfBounds { x, start: 0.0, end: 1.0 })?;
        let traj = self
            .trajectories()
            .get(idx)
            .ok_or_else(|| SwaraError::not_found("trajectory", idx.to_string()))?;
        let inner = (x - offsets[idx]) / self.dur_array[idx];
        traj.compute(inner, log_scale).map(Some)
    }

    pub fn update_fundamental(&mut self, fundamental: f64) {
        for track in &mut self.trajectory_grid {
            for t in track {
                t.update_fundamental(fundamental);
            }
        }
        for chikaris in &mut self.chikari_grid {
            for c in chikaris.values_mut() {
                c.update_fundamental(fundamental);
            }
        }
    }

    /// Re-resolve every pitch against the raga's current ratio table.
    pub fn realign_pitches(&mut self) -> Result<()> {
        let raga = self.raga.clone().ok_or(SwaraError::Missing("phrase raga"))?;
        let ratios = raga.stratified_ratios();
        for t in &mut self.trajectory_grid[0] {
            let pitches = t
                .pitches()
                .iter()
                .cloned()
                .map(|p| p.with_ratios(ratios.clone()))
                .collect::<Result<Vec<_>>>()?;
            t.set_pitches(pitches)?;
        }
        Ok(())
    }

    /// Lowest and highest pitch by frequency.
    pub fn range(&self) -> Option<PitchRange> {
        let mut pitches: Vec<&Pitch> = self
            .trajectories()
            .iter()
            .flat_map(|t| t.pitches())
            .collect();
        pitches.sort_by(|a, b| a.frequency().total_cmp(&b.frequency()));
        Some(PitchRange {
            min: (*pitches.first()?).clone(),
            max: (*pitches.last()?).clone(),
        })
    }

    /// Merge each run of adjacent silent trajectories into its first.
    pub fn consolidate_silent_trajs(&mut self) {
        let before = self.trajectories().len();
        let mut mapping = Vec::with_capacity(before);
        let mut merged: Vec<Trajectory> = Vec::with_capacity(before);
        for t in std::mem::take(self.trajectories_mut()) {
            match merged.last_mut() {
                Some(last) if last.is_silent() && t.is_silent() => {
                    last.dur_tot += t.dur_tot;
                    mapping.push(None);
                }
                _ => {
                    merged.push(t);
                    mapping.push(Some(merged.len() - 1));
                }
            }
        }
        *self.trajectories_mut() = merged;
        if self.trajectories().len() != before {
            debug!(
                "consolidated {} silent trajectories",
                before - self.trajectories().len()
            );
            self.remap_groups(|n| mapping.get(n).copied().flatten());
        }
        self.reset();
    }

    /// Remove trajectories whose duration is NaN and re-derive the total.
    pub fn drop_nan_trajectories(&mut self) -> usize {
        let nan_idxs: Vec<usize> = self
            .trajectories()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.dur_tot.is_nan())
            .map(|(i, _)| i)
            .collect();
        for &i in nan_idxs.iter().rev() {
            self.trajectories_mut().remove(i);
        }
        if !nan_idxs.is_empty() {
            warn!("dropped {} trajectories with NaN duration", nan_idxs.len());
            self.remap_groups(|n| {
                if nan_idxs.contains(&n) {
                    None
                } else {
                    Some(n - nan_idxs.iter().filter(|&&i| i < n).count())
                }
            });
        }
        self.recompute();
        nan_idxs.len()
    }

    /// Chikaris of `track` sounding within the span of `traj`.
    pub fn chikaris_during_traj(&self, traj: &Trajectory, track: usize) -> Result<Vec<ChikariDisplay>> {
        let start = traj.start_time.ok_or(SwaraError::Missing("trajectory start time"))?;
        let end = start + traj.dur_tot;
        let phrase_start = self.start_time.ok_or(SwaraError::Missing("phrase start time"))?;
        let phrase_idx = self.piece_idx.ok_or(SwaraError::Missing("phrase index"))?;
        let chikaris = self
            .chikari_grid
            .get(track)
            .ok_or_else(|| SwaraError::not_found("track", track.to_string()))?;
        Ok(chikaris
            .iter()
            .filter_map(|(k, c)| {
                let time: f64 = k.parse().ok()?;
                (time >= start && time <= end).then(|| ChikariDisplay {
                    time: time + phrase_start,
                    phrase_time_key: k.clone(),
                    phrase_idx,
                    track,
                    chikari: c.clone(),
                    u_id: c.unique_id.clone(),
                })
            })
            .collect())
    }

    /// Each sounded pitch with its absolute onset.
    pub fn swara(&self) -> Result<Vec<SwaraEvent>> {
        let phrase_start = self.start_time.ok_or(SwaraError::Missing("phrase start time"))?;
        let mut out = Vec::new();
        for t in self.trajectories().iter().filter(|t| !t.is_silent()) {
            let traj_start = t.start_time.ok_or(SwaraError::Missing("trajectory start time"))?;
            let offsets = starts(t.dur_array());
            let count = if t.dur_array().len() + 1 == t.pitches().len() {
                t.pitches().len() - 1
            } else {
                t.pitches().len()
            };
            for (pitch, offset) in t.pitches().iter().take(count).zip(offsets) {
                out.push(SwaraEvent {
                    pitch: pitch.clone(),
                    time: phrase_start + traj_start + offset * t.dur_tot,
                });
            }
        }
        Ok(out)
    }

    /// Pitches of the non-silent trajectories; with `repetition` off,
    /// immediate repeats collapse to one.
    pub fn all_pitches(&self, repetition: bool) -> Vec<Pitch> {
        let mut pitches: Vec<Pitch> = self
            .trajectories()
            .iter()
            .filter(|t| !t.is_silent())
            .flat_map(|t| t.pitches().iter().cloned())
            .collect();
        if !repetition {
            pitches.dedup_by(|b, a| a.same_as(b));
        }
        pitches
    }

    /// Indices of trajectories that begin a new sung syllable: the first
    /// sounded one, any after a silence, any with a start consonant or
    /// after an end consonant, and any whose vowel changes.
    pub fn first_traj_idxs(&self) -> Vec<usize> {
        let mut idxs = Vec::new();
        let mut seen_sound = false;
        let mut after_silence = false;
        let mut after_end_consonant = false;
        let mut last_vowel: Option<&str> = None;
        for (i, t) in self.trajectories().iter().enumerate() {
            if !t.is_silent() {
                let starts_syllable = !seen_sound
                    || after_silence
                    || t.start_consonant.is_some()
                    || after_end_consonant
                    || t.vowel.as_deref() != last_vowel;
                if starts_syllable {
                    idxs.push(i);
                }
                seen_sound = true;
                after_end_consonant = t.end_consonant.is_some();
                last_vowel = t.vowel.as_deref();
            }
            after_silence = t.is_silent();
        }
        idxs
    }

    /// Index of the trajectory sounding at absolute `time`.
    pub fn traj_idx_from_time(&self, time: f64) -> Result<usize> {
        let phrase_start = self.start_time.ok_or(SwaraError::Missing("phrase start time"))?;
        let phrase_time = time - phrase_start;
        self.trajectories()
            .iter()
            .position(|t| {
                t.start_time.map_or(false, |s| {
                    phrase_time >= s - 1e-10 && phrase_time < s + t.dur_tot
                })
            })
            .ok_or_else(|| SwaraError::not_found("trajectory at time", time.to_string()))
    }

    /// Pitches of every shaped trajectory, plus fixed ones that carry an
    /// articulation.
    pub fn to_note_view_phrase(&self) -> NoteViewPhrase {
        let pitches = self
            .trajectories()
            .iter()
            .filter(|t| t.id != crate::trajectory::Shape::Fixed || !t.articulations().is_empty())
            .flat_map(|t| t.pitches().iter().cloned())
            .collect();
        NoteViewPhrase {
            pitches,
            dur_tot: self.dur_tot,
            raga: self.raga.clone(),
            start_time: self.start_time,
        }
    }

    /// Group the adjacent trajectories at `nums` on the first track.
    pub fn add_group(&mut self, nums: Vec<usize>) -> Result<&Group> {
        let group = Group::new(&mut self.trajectory_grid[0], nums, None)?;
        self.groups_grid[0].push(group);
        Ok(&self.groups_grid[0][self.groups_grid[0].len() - 1])
    }

    pub fn groups(&self, track: usize) -> Result<&[Group]> {
        self.groups_grid
            .get(track)
            .map(Vec::as_slice)
            .ok_or_else(|| SwaraError::not_found("groups for track", track.to_string()))
    }

    pub fn group_from_id(&self, id: &str) -> Option<&Group> {
        self.groups_grid.iter().flatten().find(|g| g.id.as_str() == id)
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhraseWire<'a> {
    dur_tot: f64,
    dur_array: &'a [f64],
    chikaris: &'a BTreeMap<String, Chikari>,
    chikari_grid: &'a [BTreeMap<String, Chikari>],
    #[serde(skip_serializing_if = "Option::is_none")]
    raga: Option<&'a Raga>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<f64>,
    trajectory_grid: &'a [Vec<Trajectory>],
    instrumentation: &'a [Instrument],
    groups_grid: Vec<Vec<GroupView<'a>>>,
    categorization_grid: &'a [PhraseCategorization],
    unique_id: &'a UniqueId,
    ad_hoc_categorization_grid: &'a [String],
}

impl Serialize for Phrase {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let trajs = self.trajectories();
        PhraseWire {
            dur_tot: self.dur_tot,
            dur_array: &self.dur_array,
            chikaris: self.chikaris(),
            chikari_grid: &self.chikari_grid,
            raga: self.raga.as_deref(),
            start_time: self.start_time,
            trajectory_grid: &self.trajectory_grid,
            instrumentation: &self.instrumentation,
            groups_grid: self
                .groups_grid
                .iter()
                .map(|groups| groups.iter().map(|g| g.view(trajs)).collect())
                .collect(),
            categorization_grid: &self.categorization_grid,
            unique_id: &self.unique_id,
            ad_hoc_categorization_grid: &self.ad_hoc_categorization_grid,
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupDocument {
    #[serde(default)]
    id: Option<UniqueId>,
    #[serde(default)]
    trajectories: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhraseDocument {
    trajectories: Option<Vec<Trajectory>>,
    trajectory_grid: Option<Vec<Vec<Trajectory>>>,
    dur_tot: Option<f64>,
    chikaris: Option<BTreeMap<String, Chikari>>,
    chikari_grid: Option<Vec<BTreeMap<String, Chikari>>>,
    raga: Option<Raga>,
    start_time: Option<f64>,
    instrumentation: Option<Vec<Instrument>>,
    groups_grid: Option<Vec<Vec<GroupDocument>>>,
    categorization_grid: Option<Vec<PhraseCategorization>>,
    ad_hoc_categorization_grid: Option<Vec<String>>,
    unique_id: Option<UniqueId>,
    piece_idx: Option<usize>,
}

impl PhraseDocument {
    /// Durations are re-derived from the trajectories, never rescaled;
    /// groups are rebuilt from each listed trajectory's `num`.
    fn into_phrase(self) -> Result<Phrase> {
        let mut phrase = Phrase::assemble(
            PhraseOptions {
                trajectories: self.trajectories,
                trajectory_grid: self.trajectory_grid,
                dur_tot: self.dur_tot,
                dur_array: None,
                chikaris: self.chikaris,
                chikari_grid: self.chikari_grid,
                raga: self.raga.map(Rc::new),
                start_time: self.start_time,
                instrumentation: self.instrumentation,
                categorization_grid: self.categorization_grid,
                ad_hoc_categorization_grid: self.ad_hoc_categorization_grid,
                unique_id: self.unique_id,
                piece_idx: self.piece_idx,
            },
            false,
        );
        phrase.assign_phrase_idx();
        for (track, groups) in self.groups_grid.unwrap_or_default().into_iter().enumerate() {
            if track >= phrase.groups_grid.len() {
                break;
            }
            for doc in groups {
                let nums = doc
                    .trajectories
                    .iter()
                    .map(|t| {
                        t.get("num")
                            .and_then(Value::as_u64)
                            .map(|n| n as usize)
                            .ok_or_else(|| {
                                SwaraError::Document("grouped trajectory has no num".to_string())
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let group = Group::new(&mut phrase.trajectory_grid[0], nums, doc.id)?;
                phrase.groups_grid[track].push(group);
            }
        }
        Ok(phrase)
    }
}

impl<'de> Deserialize<'de> for Phrase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        PhraseDocument::deserialize(deserializer)?
            .into_phrase()
            .map_err(serde::de::Error::custom)
    }
}
