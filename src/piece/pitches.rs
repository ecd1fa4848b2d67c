use std::collections::BTreeMap;

use super::Piece;
use crate::error::Result;
use crate::pitch::Pitch;
use crate::trajectory::{OutputType, PitchKey, Trajectory};

/// Whether aggregated durations are raw seconds or fractions of the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountType {
    #[default]
    Cumulative,
    Proportional,
}

/// Sum the time every trajectory holds each pitch, keyed by `output`.
pub fn durations_of_fixed_pitches<'a>(
    trajs: impl IntoIterator<Item = &'a Trajectory>,
    output: OutputType,
    count: CountType,
) -> Result<BTreeMap<PitchKey, f64>> {
    let mut durs: BTreeMap<PitchKey, f64> = BTreeMap::new();
    for traj in trajs {
        for (key, dur) in traj.durations_of_fixed_pitches(output)? {
            *durs.entry(key).or_insert(0.0) += dur;
        }
    }
    if count == CountType::Proportional {
        let total: f64 = durs.values().sum();
        if total > 0.0 {
            for dur in durs.values_mut() {
                *dur /= total;
            }
        }
    }
    Ok(durs)
}

impl Piece {
    pub fn durations_of_fixed_pitches(&self, track: usize, output: OutputType) -> Result<BTreeMap<PitchKey, f64>> {
        durations_of_fixed_pitches(self.all_trajectories(track)?, output, CountType::Cumulative)
    }

    pub fn proportions_of_fixed_pitches(&self, track: usize, output: OutputType) -> Result<BTreeMap<PitchKey, f64>> {
        durations_of_fixed_pitches(self.all_trajectories(track)?, output, CountType::Proportional)
    }

    pub fn all_pitches(&self, repetition: bool, track: usize) -> Result<Vec<Pitch>> {
        let mut pitches: Vec<Pitch> = self
            .track(track)?
            .iter()
            .flat_map(|p| p.all_pitches(true))
            .collect();
        if !repetition {
            pitches.dedup_by(|b, a| a.same_as(b));
        }
        Ok(pitches)
    }

    pub fn all_pitch_numbers(&self, repetition: bool, track: usize) -> Result<Vec<i32>> {
        Ok(self
            .all_pitches(repetition, track)?
            .iter()
            .map(Pitch::numbered_pitch)
            .collect())
    }

    /// `None` when track 0 has no sounded pitch.
    pub fn highest_pitch_number(&self) -> Result<Option<i32>> {
        Ok(self.all_pitch_numbers(true, 0)?.into_iter().max())
    }

    pub fn lowest_pitch_number(&self) -> Result<Option<i32>> {
        Ok(self.all_pitch_numbers(true, 0)?.into_iter().min())
    }
}
