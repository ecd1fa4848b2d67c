use super::Piece;
use crate::error::{Result, SwaraError};
use crate::meter::Meter;
use crate::phrase::Phrase;
use crate::trajectory::Trajectory;
use crate::util::{ends, starts};

impl Piece {
    pub fn all_trajectories(&self, track: usize) -> Result<Vec<&Trajectory>> {
        Ok(self
            .track(track)?
            .iter()
            .flat_map(|p| p.trajectories())
            .collect())
    }

    /// Absolute start of every trajectory on `track`, accumulated from
    /// their durations.
    pub fn traj_start_times(&self, track: usize) -> Result<Vec<f64>> {
        let durs: Vec<f64> = self
            .all_trajectories(track)?
            .iter()
            .map(|t| t.dur_tot)
            .collect();
        Ok(starts(&durs))
    }

    /// The trajectory sounding at `time`; the first one when `time`
    /// precedes everything.
    pub fn traj_from_time(&self, time: f64, track: usize) -> Result<&Trajectory> {
        let trajs = self.all_trajectories(track)?;
        let starts = self.traj_start_times(track)?;
        let idx = match starts.iter().rposition(|&s| time >= s) {
            None => 0,
            Some(i) if time < starts[i] + trajs[i].dur_tot => i,
            Some(i) => i + 1,
        };
        trajs
            .get(idx)
            .copied()
            .ok_or_else(|| SwaraError::not_found("trajectory at time", time.to_string()))
    }

    /// Index of the last phrase starting at or before `time`; 0 when
    /// `time` precedes everything.
    pub fn phrase_idx_from_time(&self, time: f64, track: usize) -> Result<usize> {
        let starts = self.dur_starts(track)?;
        if starts.is_empty() {
            return Err(SwaraError::not_found("phrase at time", time.to_string()));
        }
        Ok(starts.iter().rposition(|&s| time >= s).unwrap_or(0))
    }

    pub fn phrase_from_time(&self, time: f64, track: usize) -> Result<&Phrase> {
        let idx = self.phrase_idx_from_time(time, track)?;
        self.track(track)?
            .get(idx)
            .ok_or_else(|| SwaraError::not_found("phrase at time", time.to_string()))
    }

    /// The trajectory with the latest end time not after `time`.
    pub fn most_recent_traj(&self, time: f64, track: usize) -> Result<&Trajectory> {
        let mut best: Option<(f64, &Trajectory)> = None;
        for phrase in self.track(track)? {
            let phrase_start = phrase
                .start_time
                .ok_or(SwaraError::Missing("phrase start time"))?;
            for t in phrase.trajectories() {
                let end = phrase_start + t.end_time()?;
                if end <= time && best.map_or(true, |(b, _)| end > b) {
                    best = Some((end, t));
                }
            }
        }
        best.map(|(_, t)| t)
            .ok_or_else(|| SwaraError::not_found("trajectory ending before", time.to_string()))
    }

    /// Start of each fixed-width window covering the piece.
    pub(super) fn chunk_starts(&self, duration: f64) -> Result<Vec<f64>> {
        if !(duration > 0.0) {
            return Err(SwaraError::InvalidValue(format!(
                "chunk duration must be positive: {}",
                duration
            )));
        }
        Ok((0..)
            .map(|k| k as f64 * duration)
            .take_while(|&i| i < self.dur_tot)
            .collect())
    }

    /// Items whose time falls in `[i, i + duration)`, per window.
    pub(super) fn chunk_by_time<T: Clone>(
        &self,
        items: &[T],
        duration: f64,
        time: impl Fn(&T) -> f64,
    ) -> Result<Vec<Vec<T>>> {
        Ok(self
            .chunk_starts(duration)?
            .into_iter()
            .map(|i| {
                items
                    .iter()
                    .filter(|item| {
                        let t = time(item);
                        t >= i && t < i + duration
                    })
                    .cloned()
                    .collect()
            })
            .collect())
    }

    /// Trajectories per window: those starting in it, ending in it, or
    /// spanning it.
    pub fn chunked_trajs(&self, track: usize, duration: f64) -> Result<Vec<Vec<&Trajectory>>> {
        let trajs = self.all_trajectories(track)?;
        let durs: Vec<f64> = trajs.iter().map(|t| t.dur_tot).collect();
        let (starts, ends) = (starts(&durs), ends(&durs));
        Ok(self
            .chunk_starts(duration)?
            .into_iter()
            .map(|i| {
                let hi = i + duration;
                trajs
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| {
                        let (s, e) = (starts[j], ends[j]);
                        (s >= i && s < hi) || (e > i && e <= hi) || (s < i && e > hi)
                    })
                    .map(|(_, t)| *t)
                    .collect()
            })
            .collect())
    }

    pub fn chunked_meters(&self, duration: f64) -> Result<Vec<Vec<Meter>>> {
        self.chunk_by_time(self.meters(), duration, |m| m.start_time)
    }
}
