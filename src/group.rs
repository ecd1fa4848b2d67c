use serde::Serialize;

use crate::error::{Result, SwaraError};
use crate::pitch::Pitch;
use crate::trajectory::Trajectory;
use crate::uid::UniqueId;

/// A run of adjacent trajectories inside one phrase.
///
/// Holds trajectory positions, not trajectories; every accessor resolves
/// against the phrase's live trajectory list, so edits to those
/// trajectories show through the group.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: UniqueId,
    traj_nums: Vec<usize>,
}

impl Group {
    /// Group the trajectories at `nums`, stamping each with the group id.
    pub fn new(trajectories: &mut [Trajectory], mut nums: Vec<usize>, id: Option<UniqueId>) -> Result<Self> {
        nums.sort_unstable();
        nums.dedup();
        if nums.len() < 2 {
            return Err(SwaraError::InvalidValue(
                "a group needs at least two trajectories".to_string(),
            ));
        }
        check_adjacent(trajectories, &nums)?;
        let group = Group {
            id: id.unwrap_or_default(),
            traj_nums: nums,
        };
        group.stamp(trajectories);
        Ok(group)
    }

    pub fn traj_nums(&self) -> &[usize] {
        &self.traj_nums
    }

    pub fn contains(&self, num: usize) -> bool {
        self.traj_nums.contains(&num)
    }

    /// Extend the group by one more adjacent trajectory.
    pub fn add_traj(&mut self, trajectories: &mut [Trajectory], num: usize) -> Result<()> {
        let mut nums = self.traj_nums.clone();
        nums.push(num);
        nums.sort_unstable();
        nums.dedup();
        check_adjacent(trajectories, &nums)?;
        self.traj_nums = nums;
        self.stamp(trajectories);
        Ok(())
    }

    pub fn trajectories<'a>(&self, trajectories: &'a [Trajectory]) -> Vec<&'a Trajectory> {
        self.traj_nums
            .iter()
            .filter_map(|&n| trajectories.get(n))
            .collect()
    }

    pub fn min_freq(&self, trajectories: &[Trajectory]) -> f64 {
        self.trajectories(trajectories)
            .iter()
            .map(|t| t.min_freq())
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_freq(&self, trajectories: &[Trajectory]) -> f64 {
        self.trajectories(trajectories)
            .iter()
            .map(|t| t.max_freq())
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn all_pitches(&self, trajectories: &[Trajectory], repetition: bool) -> Vec<Pitch> {
        let mut pitches: Vec<Pitch> = self
            .trajectories(trajectories)
            .into_iter()
            .filter(|t| !t.is_silent())
            .flat_map(|t| t.pitches().iter().cloned())
            .collect();
        if !repetition {
            pitches.dedup_by(|b, a| a.same_as(b));
        }
        pitches
    }

    /// Renumber after the phrase's trajectory list changed; `None` when
    /// the group no longer spans two adjacent trajectories.
    pub(crate) fn remap(&self, map: impl Fn(usize) -> Option<usize>) -> Option<Group> {
        let nums: Vec<usize> = self.traj_nums.iter().filter_map(|&n| map(n)).collect();
        let consecutive = nums.windows(2).all(|w| w[1] == w[0] + 1);
        (nums.len() >= 2 && consecutive).then(|| Group {
            id: self.id.clone(),
            traj_nums: nums,
        })
    }

    pub(crate) fn view<'a>(&'a self, trajectories: &'a [Trajectory]) -> GroupView<'a> {
        GroupView {
            trajectories: self.trajectories(trajectories),
            id: &self.id,
        }
    }

    fn stamp(&self, trajectories: &mut [Trajectory]) {
        for &n in &self.traj_nums {
            if let Some(t) = trajectories.get_mut(n) {
                t.group_id = Some(self.id.to_string());
            }
        }
    }
}

/// Wire form: the group's trajectories written out in full.
#[derive(Serialize)]
pub(crate) struct GroupView<'a> {
    trajectories: Vec<&'a Trajectory>,
    id: &'a UniqueId,
}

fn check_adjacent(trajectories: &[Trajectory], nums: &[usize]) -> Result<()> {
    if let Some(&n) = nums.iter().find(|&&n| n >= trajectories.len()) {
        return Err(SwaraError::not_found("trajectory", n.to_string()));
    }
    let phrase_idx = trajectories[nums[0]].phrase_idx;
    let same_phrase = nums.iter().all(|&n| trajectories[n].phrase_idx == phrase_idx);
    let consecutive = nums.windows(2).all(|w| w[1] == w[0] + 1);
    if !(same_phrase && consecutive) {
        return Err(SwaraError::InvalidValue(format!(
            "trajectories are not adjacent: {:?}",
            nums
        )));
    }
    Ok(())
}
