//! The top-level transcription aggregate.
//!
//! A [`Piece`] owns one phrase list per instrument track. All tracks share
//! one absolute length, `dur_tot`; each track also keeps its phrase
//! durations as fractions of that length in `dur_array_grid`. Phrase start
//! times are derived from those fractions and nowhere else.
//!
//! Nothing recomputes on its own: after editing trajectories or phrases,
//! call [`Piece::dur_array_from_phrases`] to restore the invariants.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use log::debug;

use crate::assemblage::{Assemblage, AssemblageDescriptor};
use crate::error::{Result, SwaraError};
use crate::group::Group;
use crate::instrument::Instrument;
use crate::meter::{Meter, Pulse};
use crate::phrase::Phrase;
use crate::raga::Raga;
use crate::section::{Section, SectionCategorization};
use crate::trajectory::{Shape, Trajectory};

mod display;
mod document;
mod durations;
mod pitches;
mod timeline;

pub use display::{BolDisplay, DivKind, PhraseDivDisplay, SargamDisplay, SyllableDisplay};
pub use document::{ExcerptRange, ExplicitPermissions};
pub use pitches::{durations_of_fixed_pitches, CountType};

pub const DEFAULT_TITLE: &str = "untitled";
pub const DEFAULT_LOCATION: &str = "Santa Cruz";
/// Width of a display chunk, in seconds.
pub const DEFAULT_CHUNK_DURATION: f64 = 30.0;

/// Constructor input for [`Piece`]. Single-track fields (`phrases`,
/// `dur_array`, `section_starts`, `section_categorization`) fill track 0
/// when the matching grid is absent.
#[derive(Debug, Clone, Default)]
pub struct PieceOptions {
    pub phrases: Option<Vec<Phrase>>,
    pub phrase_grid: Option<Vec<Vec<Phrase>>>,
    pub dur_tot: Option<f64>,
    pub dur_array: Option<Vec<f64>>,
    pub dur_array_grid: Option<Vec<Vec<f64>>>,
    pub raga: Option<Rc<Raga>>,
    pub instrumentation: Option<Vec<Instrument>>,
    pub title: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub id: Option<String>,
    pub audio_id: Option<String>,
    pub audio_db_id: Option<String>,
    pub user_id: Option<String>,
    pub permissions: Option<String>,
    pub name: Option<String>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub section_starts: Option<Vec<usize>>,
    pub section_starts_grid: Option<Vec<Vec<usize>>>,
    pub section_categorization: Option<Vec<SectionCategorization>>,
    pub section_cat_grid: Option<Vec<Vec<SectionCategorization>>>,
    pub ad_hoc_section_cat_grid: Option<Vec<Vec<Vec<String>>>>,
    pub meters: Option<Vec<Meter>>,
    pub explicit_permissions: Option<ExplicitPermissions>,
    pub soloist: Option<String>,
    pub solo_instrument: Option<String>,
    pub excerpt_range: Option<ExcerptRange>,
    pub assemblage_descriptors: Option<Vec<AssemblageDescriptor>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    pub phrase_grid: Vec<Vec<Phrase>>,
    pub instrumentation: Vec<Instrument>,
    pub dur_tot: f64,
    pub dur_array_grid: Vec<Vec<f64>>,
    raga: Rc<Raga>,
    pub section_starts_grid: Vec<Vec<usize>>,
    pub section_cat_grid: Vec<Vec<SectionCategorization>>,
    pub ad_hoc_section_cat_grid: Vec<Vec<Vec<String>>>,
    meters: Vec<Meter>,
    pub assemblage_descriptors: Vec<AssemblageDescriptor>,
    pub title: String,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    pub location: String,
    pub id: Option<String>,
    pub audio_id: Option<String>,
    pub audio_db_id: Option<String>,
    pub user_id: Option<String>,
    pub permissions: Option<String>,
    pub name: Option<String>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub explicit_permissions: ExplicitPermissions,
    pub soloist: Option<String>,
    pub solo_instrument: Option<String>,
    pub excerpt_range: Option<ExcerptRange>,
}

impl Default for Piece {
    fn default() -> Self {
        Piece::new(PieceOptions::default())
    }
}

impl Piece {
    /// Durations are derived from the phrases unless both `dur_tot` and a
    /// `dur_array_grid` matching the phrase counts are supplied, in which
    /// case only start times are rederived.
    pub fn new(opts: PieceOptions) -> Self {
        let mut instrumentation = opts.instrumentation.unwrap_or_default();
        if instrumentation.is_empty() {
            instrumentation.push(Instrument::Sitar);
        }
        let tracks = instrumentation.len();

        let mut phrase_grid = opts
            .phrase_grid
            .unwrap_or_else(|| vec![opts.phrases.unwrap_or_default()]);
        phrase_grid.resize_with(tracks, Vec::new);

        let declared_grid = opts
            .dur_array_grid
            .or_else(|| opts.dur_array.map(|d| vec![d]));

        let mut section_starts_grid = opts
            .section_starts_grid
            .unwrap_or_else(|| vec![opts.section_starts.unwrap_or_else(|| vec![0])]);
        section_starts_grid.resize_with(tracks, || vec![0]);
        for starts in &mut section_starts_grid {
            starts.sort_unstable();
        }

        let mut section_cat_grid = match opts.section_cat_grid {
            Some(grid) => grid,
            None => vec![opts.section_categorization.unwrap_or_default()],
        };
        section_cat_grid.resize_with(tracks, Vec::new);
        for (cats, starts) in section_cat_grid.iter_mut().zip(&section_starts_grid) {
            if cats.len() < starts.len() {
                debug!("padding section categorization to {} sections", starts.len());
                cats.resize_with(starts.len(), SectionCategorization::default);
            }
        }

        let mut ad_hoc_section_cat_grid: Vec<Vec<Vec<String>>> = opts
            .ad_hoc_section_cat_grid
            .unwrap_or_default()
            .into_iter()
            .map(|track| {
                track
                    .into_iter()
                    .map(|fields| fields.into_iter().filter(|f| !f.is_empty()).collect())
                    .collect()
            })
            .collect();
        ad_hoc_section_cat_grid.resize_with(tracks, Vec::new);
        for (ad_hoc, cats) in ad_hoc_section_cat_grid.iter_mut().zip(&section_cat_grid) {
            if ad_hoc.len() < cats.len() {
                ad_hoc.resize_with(cats.len(), Vec::new);
            }
        }

        let now = Utc::now();
        let mut piece = Piece {
            phrase_grid,
            instrumentation,
            dur_tot: 0.0,
            dur_array_grid: vec![Vec::new(); tracks],
            raga: opts.raga.unwrap_or_default(),
            section_starts_grid,
            section_cat_grid,
            ad_hoc_section_cat_grid,
            meters: opts.meters.unwrap_or_default(),
            assemblage_descriptors: opts.assemblage_descriptors.unwrap_or_default(),
            title: opts.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            date_created: opts.date_created.unwrap_or(now),
            date_modified: opts.date_modified.unwrap_or(now),
            location: opts.location.unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            id: opts.id,
            audio_id: opts.audio_id,
            audio_db_id: opts.audio_db_id,
            user_id: opts.user_id,
            permissions: opts.permissions,
            name: opts.name,
            family_name: opts.family_name,
            given_name: opts.given_name,
            explicit_permissions: opts.explicit_permissions.unwrap_or_default(),
            soloist: opts.soloist,
            solo_instrument: opts.solo_instrument,
            excerpt_range: opts.excerpt_range,
        };

        let declared = match (opts.dur_tot, declared_grid) {
            (Some(dur_tot), Some(mut grid)) => {
                grid.resize_with(tracks, Vec::new);
                piece.declared_grid_fits(&grid).then(|| (dur_tot, grid))
            }
            _ => None,
        };
        match declared {
            Some((dur_tot, grid)) => {
                piece.dur_tot = dur_tot;
                piece.dur_array_grid = grid;
                piece.update_start_times();
            }
            None => piece.dur_array_from_phrases(),
        }
        piece.put_raga_in_phrases();
        piece
    }

    /// A declared grid is accepted when each row lines up with its track.
    fn declared_grid_fits(&self, grid: &[Vec<f64>]) -> bool {
        grid.iter()
            .zip(&self.phrase_grid)
            .all(|(row, phrases)| row.len() == phrases.len())
    }

    pub fn raga(&self) -> &Rc<Raga> {
        &self.raga
    }

    pub fn phrases(&self) -> &[Phrase] {
        &self.phrase_grid[0]
    }

    pub fn dur_array(&self) -> &[f64] {
        &self.dur_array_grid[0]
    }

    pub fn section_starts(&self) -> &[usize] {
        &self.section_starts_grid[0]
    }

    pub fn track(&self, track: usize) -> Result<&[Phrase]> {
        self.phrase_grid
            .get(track)
            .map(Vec::as_slice)
            .ok_or_else(|| SwaraError::not_found("track", track.to_string()))
    }

    pub fn track_mut(&mut self, track: usize) -> Result<&mut Vec<Phrase>> {
        self.phrase_grid
            .get_mut(track)
            .ok_or_else(|| SwaraError::not_found("track", track.to_string()))
    }

    pub fn put_raga_in_phrases(&mut self) {
        for phrase in self.phrase_grid.iter_mut().flatten() {
            phrase.raga = Some(Rc::clone(&self.raga));
        }
    }

    /// Retune the shared raga and every pitch that depends on it.
    pub fn update_fundamental(&mut self, fundamental: f64) {
        let mut raga = (*self.raga).clone();
        raga.fundamental = fundamental;
        self.raga = Rc::new(raga);
        for phrase in self.phrase_grid.iter_mut().flatten() {
            phrase.update_fundamental(fundamental);
        }
        self.put_raga_in_phrases();
    }

    pub fn realign_pitches(&mut self) -> Result<()> {
        self.put_raga_in_phrases();
        for phrase in self.phrase_grid.iter_mut().flatten() {
            phrase.realign_pitches()?;
        }
        Ok(())
    }

    pub fn meters(&self) -> &[Meter] {
        &self.meters
    }

    pub fn add_meter(&mut self, meter: Meter) -> Result<()> {
        if let Some(m) = self.meters.iter().find(|m| m.overlaps(&meter)) {
            return Err(SwaraError::InvalidValue(format!(
                "meter at {} overlaps meter {} at {}",
                meter.start_time, m.unique_id, m.start_time
            )));
        }
        self.meters.push(meter);
        Ok(())
    }

    pub fn remove_meter(&mut self, unique_id: &str) -> Result<Meter> {
        let idx = self
            .meters
            .iter()
            .position(|m| m.unique_id.as_str() == unique_id)
            .ok_or_else(|| SwaraError::not_found("meter", unique_id))?;
        Ok(self.meters.remove(idx))
    }

    pub fn pulse_from_id(&self, id: &str) -> Option<Pulse> {
        self.meters
            .iter()
            .flat_map(Meter::all_pulses)
            .find(|p| p.unique_id == id)
    }

    /// Each track's phrases cut at its section starts.
    pub fn sections_grid(&self) -> Vec<Vec<Section<'_>>> {
        self.section_starts_grid
            .iter()
            .enumerate()
            .map(|(track, starts)| {
                let phrases = &self.phrase_grid[track];
                starts
                    .iter()
                    .enumerate()
                    .map(|(j, &s)| {
                        let end = starts.get(j + 1).copied().unwrap_or(phrases.len());
                        let (s, end) = (s.min(phrases.len()), end.min(phrases.len()));
                        Section {
                            phrases: &phrases[s..end.max(s)],
                            categorization: &self.section_cat_grid[track][j],
                            ad_hoc_categorization: &self.ad_hoc_section_cat_grid[track][j],
                        }
                    })
                    .collect()
            })
            .collect()
    }

    pub fn sections(&self) -> Vec<Section<'_>> {
        self.sections_grid().swap_remove(0)
    }

    /// Index of the section holding phrase `p_idx`.
    pub fn s_idx_from_p_idx(&self, p_idx: usize, track: usize) -> Result<usize> {
        let starts = self
            .section_starts_grid
            .get(track)
            .ok_or_else(|| SwaraError::not_found("track", track.to_string()))?;
        starts
            .iter()
            .rposition(|&s| p_idx >= s)
            .ok_or_else(|| SwaraError::not_found("section for phrase", p_idx.to_string()))
    }

    pub fn assemblages(&self) -> Result<Vec<Assemblage<'_>>> {
        let all: Vec<&Phrase> = self.phrase_grid.iter().flatten().collect();
        self.assemblage_descriptors
            .iter()
            .map(|d| Assemblage::from_descriptor(d, &all))
            .collect()
    }

    /// Shapes each track's instrument may use.
    pub fn traj_idxs_grid(&self) -> Vec<Vec<Shape>> {
        self.instrumentation
            .iter()
            .map(|i| i.possible_shapes())
            .collect()
    }

    /// The two highest drone frequencies on a track.
    pub fn chikari_freqs(&self, track: usize) -> Result<Vec<f64>> {
        let first = self
            .track(track)?
            .iter()
            .flat_map(|p| p.chikaris().values())
            .next();
        Ok(match first {
            Some(c) => c.freqs().into_iter().take(2).collect(),
            None => vec![self.raga.fundamental * 2.0, self.raga.fundamental * 4.0],
        })
    }

    pub fn all_groups(&self, track: usize) -> Result<Vec<&Group>> {
        let mut groups = Vec::new();
        for phrase in self.track(track)? {
            groups.extend(phrase.groups(0)?);
        }
        Ok(groups)
    }

    pub fn phrase_from_uid(&self, uid: &str) -> Result<&Phrase> {
        self.phrase_grid
            .iter()
            .flatten()
            .find(|p| p.unique_id.as_str() == uid)
            .ok_or_else(|| SwaraError::not_found("phrase", uid))
    }

    pub fn track_from_phrase_uid(&self, uid: &str) -> Result<usize> {
        self.phrase_grid
            .iter()
            .position(|ps| ps.iter().any(|p| p.unique_id.as_str() == uid))
            .ok_or_else(|| SwaraError::not_found("phrase", uid))
    }

    pub fn traj_from_uid(&self, uid: &str, track: usize) -> Result<&Trajectory> {
        self.track(track)?
            .iter()
            .flat_map(|p| p.trajectories())
            .find(|t| t.unique_id.as_str() == uid)
            .ok_or_else(|| SwaraError::not_found("trajectory", uid))
    }

    pub fn track_from_traj_uid(&self, uid: &str) -> Result<usize> {
        self.phrase_grid
            .iter()
            .position(|ps| {
                ps.iter()
                    .flat_map(|p| p.trajectories())
                    .any(|t| t.unique_id.as_str() == uid)
            })
            .ok_or_else(|| SwaraError::not_found("trajectory", uid))
    }

    /// Index of the phrase holding group `group_id`, on track 0.
    pub fn p_idx_from_group(&self, group_id: &str) -> Result<usize> {
        self.phrases()
            .iter()
            .position(|p| p.group_from_id(group_id).is_some())
            .ok_or_else(|| SwaraError::not_found("group", group_id))
    }
}

#[cfg(test)]
mod tests;
