use serde::Serialize;

use super::Piece;
use crate::articulation::{END_KEY, START_KEY};
use crate::chikari::ChikariDisplay;
use crate::error::{Result, SwaraError};
use crate::uid::UniqueId;
use crate::util::{round5, starts};

/// A sargam label placed on the timeline.
///
/// `pos` is a layout code: 0 both neighbours higher, 1 neither higher,
/// 2 only the next higher, 3 only the previous higher; 4 and 5 mark a
/// label on a phrase boundary, 5 when the next label is higher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SargamDisplay {
    pub log_freq: f64,
    pub sargam: String,
    pub time: f64,
    pub u_id: UniqueId,
    pub track: usize,
    pub solfege: &'static str,
    pub pitch_class: String,
    pub western_pitch: &'static str,
    pub pos: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BolDisplay {
    pub time: f64,
    pub bol: String,
    pub u_id: UniqueId,
    pub log_freq: f64,
    pub track: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DivKind {
    Phrase,
    Section,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseDivDisplay {
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: DivKind,
    pub idx: usize,
    pub track: usize,
    pub u_id: UniqueId,
}

/// Sung text placed on the timeline: a syllable onset or an ending
/// consonant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllableDisplay {
    pub time: f64,
    pub log_freq: f64,
    pub ipa_text: String,
    pub devanagari_text: String,
    pub english_text: String,
    pub u_id: UniqueId,
}

fn layout_code(last_higher: bool, next_higher: bool, on_division: bool) -> u8 {
    match (on_division, last_higher, next_higher) {
        (true, _, true) => 5,
        (true, _, false) => 4,
        (false, true, true) => 0,
        (false, false, false) => 1,
        (false, false, true) => 2,
        (false, true, false) => 3,
    }
}

impl Piece {
    pub fn all_display_sargam(&self, track: usize) -> Result<Vec<SargamDisplay>> {
        let trajs = self.all_trajectories(track)?;
        let traj_starts = self.traj_start_times(track)?;
        let mut sargams: Vec<SargamDisplay> = Vec::new();
        let mut last_log_freq: Option<f64> = None;
        for (t, traj_start) in trajs.iter().zip(&traj_starts) {
            if t.is_silent() {
                continue;
            }
            let sub_durs: Vec<f64> = t.dur_array().iter().map(|d| d * t.dur_tot).collect();
            let mut points = starts(&sub_durs);
            points.push(t.dur_tot);
            let log_freqs = t.log_freqs();
            for (i, point) in points.iter().enumerate() {
                let Some(&log_freq) = log_freqs.get(i).or_else(|| log_freqs.last()) else {
                    continue;
                };
                if last_log_freq != Some(log_freq) {
                    let pitch = &t.pitches()[i.min(t.pitches().len() - 1)];
                    sargams.push(SargamDisplay {
                        log_freq,
                        sargam: pitch.sargam_letter(),
                        time: point + traj_start,
                        u_id: t.unique_id.clone(),
                        track,
                        solfege: pitch.solfege_letter(),
                        pitch_class: pitch.chroma().to_string(),
                        western_pitch: pitch.western_pitch(),
                        pos: 1,
                    });
                }
                last_log_freq = Some(log_freq);
            }
        }

        let divisions: Vec<f64> = self
            .track(track)?
            .iter()
            .map(|p| round5(p.start_time.unwrap_or(0.0) + p.dur_tot))
            .collect();
        let n = sargams.len();
        let neighbours: Vec<(bool, bool)> = (0..n)
            .map(|i| {
                if i == 0 || i + 1 == n {
                    (true, true)
                } else {
                    let lf = sargams[i].log_freq;
                    (sargams[i - 1].log_freq > lf, sargams[i + 1].log_freq > lf)
                }
            })
            .collect();
        for (s, (last_higher, next_higher)) in sargams.iter_mut().zip(neighbours) {
            let on_division = divisions.contains(&round5(s.time));
            s.pos = layout_code(last_higher, next_higher, on_division);
        }
        Ok(sargams)
    }

    /// Stroke names for every trajectory that opens with a pluck.
    pub fn all_display_bols(&self, track: usize) -> Result<Vec<BolDisplay>> {
        let trajs = self.all_trajectories(track)?;
        let traj_starts = self.traj_start_times(track)?;
        Ok(trajs
            .iter()
            .zip(traj_starts)
            .filter_map(|(t, time)| {
                let art = t.articulation(START_KEY).filter(|a| a.name == "pluck")?;
                let bol = art
                    .stroke_nickname
                    .clone()
                    .or_else(|| art.stroke.clone())
                    .unwrap_or_else(|| art.name.clone());
                Some(BolDisplay {
                    time,
                    bol,
                    u_id: t.unique_id.clone(),
                    log_freq: t.log_freqs().first().copied().unwrap_or_default(),
                    track,
                })
            })
            .collect())
    }

    /// Boundaries before every phrase but the first.
    pub fn all_phrase_divs(&self, track: usize) -> Result<Vec<PhraseDivDisplay>> {
        let phrases = self.track(track)?;
        let section_starts = &self.section_starts_grid[track];
        Ok(phrases
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, p)| PhraseDivDisplay {
                time: p.start_time.unwrap_or(0.0),
                kind: if section_starts.contains(&idx) {
                    DivKind::Section
                } else {
                    DivKind::Phrase
                },
                idx,
                track,
                u_id: p.unique_id.clone(),
            })
            .collect())
    }

    /// Syllable onsets on a vocal track.
    pub fn all_display_vowels(&self, track: usize) -> Result<Vec<SyllableDisplay>> {
        let instrument = self
            .instrumentation
            .get(track)
            .ok_or_else(|| SwaraError::not_found("track", track.to_string()))?;
        if !instrument.is_vocal() {
            return Err(SwaraError::InvalidValue(format!(
                "track {} is not vocal: {}",
                track, instrument
            )));
        }
        let mut out = Vec::new();
        for phrase in self.track(track)? {
            let phrase_start = phrase
                .start_time
                .ok_or(SwaraError::Missing("phrase start time"))?;
            for idx in phrase.first_traj_idxs() {
                let t = &phrase.trajectories()[idx];
                let traj_start = t.start_time.ok_or(SwaraError::Missing("trajectory start time"))?;
                let consonant = t
                    .start_consonant
                    .as_ref()
                    .and_then(|_| t.articulation(START_KEY));
                let join = |c: Option<&String>, v: &Option<String>| {
                    format!(
                        "{}{}",
                        c.map(String::as_str).unwrap_or_default(),
                        v.as_deref().unwrap_or_default()
                    )
                };
                out.push(SyllableDisplay {
                    time: phrase_start + traj_start,
                    log_freq: t.log_freqs().first().copied().unwrap_or_default(),
                    ipa_text: join(consonant.and_then(|a| a.ipa.as_ref()), &t.vowel_ipa),
                    devanagari_text: join(consonant.and_then(|a| a.hindi.as_ref()), &t.vowel_hindi),
                    english_text: join(consonant.and_then(|a| a.eng_trans.as_ref()), &t.vowel_eng_trans),
                    u_id: t.unique_id.clone(),
                });
            }
        }
        Ok(out)
    }

    pub fn all_display_ending_consonants(&self, track: usize) -> Result<Vec<SyllableDisplay>> {
        let mut out = Vec::new();
        for phrase in self.track(track)? {
            for t in phrase.trajectories().iter().filter(|t| t.end_consonant.is_some()) {
                let phrase_start = phrase
                    .start_time
                    .ok_or(SwaraError::Missing("phrase start time"))?;
                let (ipa_text, devanagari_text, english_text) = t
                    .articulation(END_KEY)
                    .map(|a| {
                        (
                            a.ipa.clone().unwrap_or_default(),
                            a.hindi.clone().unwrap_or_default(),
                            a.eng_trans.clone().unwrap_or_default(),
                        )
                    })
                    .unwrap_or_default();
                out.push(SyllableDisplay {
                    time: phrase_start + t.end_time()?,
                    log_freq: t.log_freqs().last().copied().unwrap_or_default(),
                    ipa_text,
                    devanagari_text,
                    english_text,
                    u_id: t.unique_id.clone(),
                });
            }
        }
        Ok(out)
    }

    pub fn all_display_chikaris(&self, track: usize) -> Result<Vec<ChikariDisplay>> {
        let mut out = Vec::new();
        for phrase in self.track(track)? {
            let phrase_start = phrase
                .start_time
                .ok_or(SwaraError::Missing("phrase start time"))?;
            let phrase_idx = phrase.piece_idx.ok_or(SwaraError::Missing("phrase index"))?;
            for (key, chikari) in phrase.chikaris() {
                let offset: f64 = key.parse().map_err(|_| {
                    SwaraError::Document(format!("chikari key is not a time: {}", key))
                })?;
                out.push(ChikariDisplay {
                    time: phrase_start + offset,
                    phrase_time_key: key.clone(),
                    phrase_idx,
                    track,
                    chikari: chikari.clone(),
                    u_id: chikari.unique_id.clone(),
                });
            }
        }
        Ok(out)
    }

    pub fn chunked_display_sargam(&self, track: usize, duration: f64) -> Result<Vec<Vec<SargamDisplay>>> {
        self.chunk_by_time(&self.all_display_sargam(track)?, duration, |s| s.time)
    }

    pub fn chunked_display_bols(&self, track: usize, duration: f64) -> Result<Vec<Vec<BolDisplay>>> {
        self.chunk_by_time(&self.all_display_bols(track)?, duration, |b| b.time)
    }

    pub fn chunked_phrase_divs(&self, track: usize, duration: f64) -> Result<Vec<Vec<PhraseDivDisplay>>> {
        self.chunk_by_time(&self.all_phrase_divs(track)?, duration, |d| d.time)
    }

    pub fn chunked_display_vowels(&self, track: usize, duration: f64) -> Result<Vec<Vec<SyllableDisplay>>> {
        self.chunk_by_time(&self.all_display_vowels(track)?, duration, |v| v.time)
    }

    pub fn chunked_display_consonants(
        &self,
        track: usize,
        duration: f64,
    ) -> Result<Vec<Vec<SyllableDisplay>>> {
        self.chunk_by_time(&self.all_display_ending_consonants(track)?, duration, |c| c.time)
    }

    pub fn chunked_display_chikaris(
        &self,
        track: usize,
        duration: f64,
    ) -> Result<Vec<Vec<ChikariDisplay>>> {
        self.chunk_by_time(&self.all_display_chikaris(track)?, duration, |c| c.time)
    }
}

#[cfg(test)]
mod tests {
    use super::layout_code;

    #[test]
    fn test_layout_codes() {
        assert_eq!(layout_code(true, true, false), 0);
        assert_eq!(layout_code(false, false, false), 1);
        assert_eq!(layout_code(false, true, false), 2);
        assert_eq!(layout_code(true, false, false), 3);
        assert_eq!(layout_code(true, false, true), 4);
        assert_eq!(layout_code(false, true, true), 5);
    }
}
