use log::debug;

use super::Piece;
use crate::error::{Result, SwaraError};
use crate::phrase::{Phrase, PhraseOptions};
use crate::trajectory::Trajectory;
use crate::util::starts;

/// Shortfalls below this are rounding, not missing time.
const PAD_EPSILON: f64 = 1e-9;

impl Piece {
    /// Set `dur_tot` to the longest track and pad every shorter track with
    /// a trailing silent trajectory so all tracks end together.
    ///
    /// Phrases left with a NaN total by an unfinished edit lose their NaN
    /// trajectories first.
    pub fn dur_tot_from_phrases(&mut self) {
        for phrase in self.phrase_grid.iter_mut().flatten() {
            if phrase.dur_tot.is_nan() || phrase.trajectories().iter().any(|t| t.dur_tot.is_nan()) {
                phrase.drop_nan_trajectories();
                phrase.reset();
            }
        }
        let sums: Vec<f64> = self
            .phrase_grid
            .iter()
            .map(|ps| ps.iter().map(|p| p.dur_tot).sum())
            .collect();
        let max = sums.iter().copied().fold(0.0, f64::max);
        self.dur_tot = max;
        for (track, sum) in sums.into_iter().enumerate() {
            let extra = max - sum;
            if extra > PAD_EPSILON {
                debug!("padding track {} with {:.3}s of silence", track, extra);
                self.append_silence(track, extra);
            }
        }
    }

    /// Recompute `dur_tot` and every track's fractions, then start times.
    pub fn dur_array_from_phrases(&mut self) {
        self.dur_tot_from_phrases();
        let total = self.dur_tot;
        self.dur_array_grid = self
            .phrase_grid
            .iter()
            .map(|ps| {
                if total == 0.0 {
                    Vec::new()
                } else {
                    ps.iter().map(|p| p.dur_tot / total).collect()
                }
            })
            .collect();
        self.update_start_times();
    }

    /// Whether every track's phrases add up to `dur_tot` with no NaN left
    /// behind, so a declared grid can stand.
    pub(super) fn tracks_fill_dur_tot(&self) -> bool {
        self.phrase_grid.iter().zip(&self.dur_array_grid).all(|(phrases, row)| {
            let sum: f64 = phrases.iter().map(|p| p.dur_tot).sum();
            row.len() == phrases.len() && (sum - self.dur_tot).abs() <= PAD_EPSILON
        }) && self.phrase_grid.len() == self.dur_array_grid.len()
    }

    /// Assign each phrase its start time and position from the grid.
    pub fn update_start_times(&mut self) {
        for track in 0..self.phrase_grid.len() {
            let offsets = self.scaled_starts(track);
            for (i, phrase) in self.phrase_grid[track].iter_mut().enumerate() {
                phrase.start_time = Some(offsets.get(i).copied().unwrap_or(0.0));
                phrase.piece_idx = Some(i);
                phrase.assign_phrase_idx();
            }
        }
    }

    /// Absolute phrase start times on `track`.
    pub fn dur_starts(&self, track: usize) -> Result<Vec<f64>> {
        if track >= self.dur_array_grid.len() {
            return Err(SwaraError::not_found("track", track.to_string()));
        }
        Ok(self.scaled_starts(track))
    }

    fn scaled_starts(&self, track: usize) -> Vec<f64> {
        let total = self.dur_tot;
        let durs: Vec<f64> = self
            .dur_array_grid
            .get(track)
            .map(|row| row.iter().map(|d| d * total).collect())
            .unwrap_or_default();
        starts(&durs)
    }

    /// Lengthen the piece to `dur_tot`. Every track's last phrase grows by
    /// the difference: a trailing silent trajectory is stretched, otherwise
    /// a new silent one is appended.
    pub fn set_dur_tot(&mut self, dur_tot: f64) -> Result<()> {
        if !dur_tot.is_finite() {
            return Err(SwaraError::InvalidValue(format!(
                "piece duration must be finite, got {}",
                dur_tot
            )));
        }
        if dur_tot < self.dur_tot - PAD_EPSILON {
            return Err(SwaraError::InvalidValue(format!(
                "cannot shorten a piece from {} to {}",
                self.dur_tot, dur_tot
            )));
        }
        if dur_tot - self.dur_tot <= PAD_EPSILON {
            return Ok(());
        }
        for track in 0..self.phrase_grid.len() {
            let phrases = &mut self.phrase_grid[track];
            while phrases.last().map_or(false, |p| p.dur_tot == 0.0) {
                phrases.pop();
            }
            let sum: f64 = phrases.iter().map(|p| p.dur_tot).sum();
            let extra = dur_tot - sum;
            if extra <= PAD_EPSILON {
                continue;
            }
            match phrases.last_mut().and_then(|p| {
                let silent_tail = p.trajectories().last().map_or(false, Trajectory::is_silent);
                silent_tail.then_some(p)
            }) {
                Some(phrase) => {
                    if let Some(t) = phrase.trajectories_mut().last_mut() {
                        t.dur_tot += extra;
                    }
                    phrase.reset();
                }
                None => self.append_silence(track, extra),
            }
        }
        self.dur_array_from_phrases();
        Ok(())
    }

    fn append_silence(&mut self, track: usize, dur: f64) {
        let silence = Trajectory::silent(dur, self.raga.fundamental);
        let instrument = self.instrumentation[track];
        let raga = self.raga.clone();
        let phrases = &mut self.phrase_grid[track];
        match phrases.last_mut() {
            Some(last) => {
                last.push_trajectory(silence);
                last.reset();
            }
            None => {
                let mut phrase = Phrase::new(PhraseOptions {
                    trajectories: Some(vec![silence]),
                    raga: Some(raga),
                    instrumentation: Some(vec![instrument]),
                    ..Default::default()
                });
                phrase.reset();
                phrases.push(phrase);
            }
        }
    }
}
