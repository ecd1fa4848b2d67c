use super::*;
use crate::articulation::Articulation;
use crate::assemblage::StrandDescriptor;
use crate::chikari::Chikari;
use crate::pitch::Pitch;
use crate::trajectory::{OutputType, PitchKey, TrajectoryOptions};
use chrono::TimeZone;
use float_cmp::approx_eq;
use pretty_assertions::assert_eq;
use serde_json::json;

fn fixed(swara: u8, dur: f64) -> Trajectory {
    Trajectory::new(TrajectoryOptions {
        pitches: Some(vec![Pitch::new(swara, 0, true).unwrap()]),
        dur_tot: Some(dur),
        ..Default::default()
    })
    .unwrap()
}

fn silent(dur: f64) -> Trajectory {
    Trajectory::silent(dur, 261.63)
}

fn phrase(trajs: Vec<Trajectory>) -> Phrase {
    Phrase::from_trajectories(trajs)
}

fn piece(phrases: Vec<Phrase>) -> Piece {
    Piece::new(PieceOptions {
        phrases: Some(phrases),
        ..Default::default()
    })
}

fn two_phrase_piece() -> Piece {
    piece(vec![
        phrase(vec![fixed(0, 1.0), fixed(4, 1.0)]),
        phrase(vec![fixed(2, 1.0), silent(1.0)]),
    ])
}

fn assert_consistent(p: &Piece) {
    for (track, row) in p.dur_array_grid.iter().enumerate() {
        if p.dur_tot == 0.0 {
            assert!(row.is_empty());
            continue;
        }
        let sum: f64 = row.iter().sum();
        assert!(approx_eq!(f64, sum, 1.0, epsilon = 1e-9));
        let track_sum: f64 = p.phrase_grid[track].iter().map(|ph| ph.dur_tot).sum();
        assert!(approx_eq!(f64, track_sum, p.dur_tot, epsilon = 1e-9));
        let starts = p.dur_starts(track).unwrap();
        for (ph, s) in p.phrase_grid[track].iter().zip(starts) {
            assert!(approx_eq!(f64, ph.start_time.unwrap(), s, epsilon = 1e-9));
        }
    }
}

#[test]
fn test_derived_durations() {
    let p = two_phrase_piece();
    assert_eq!(p.dur_tot, 4.0);
    assert_eq!(p.dur_array(), &[0.5, 0.5]);
    assert_eq!(p.phrases()[1].start_time, Some(2.0));
    assert_eq!(p.phrases()[1].piece_idx, Some(1));
    assert_eq!(p.phrases()[1].trajectories()[0].phrase_idx, Some(1));
    assert_consistent(&p);
}

#[test]
fn test_empty_piece() {
    let p = Piece::default();
    assert_eq!(p.dur_tot, 0.0);
    assert_eq!(p.dur_array_grid, vec![Vec::<f64>::new()]);
    assert_eq!(p.instrumentation, vec![Instrument::Sitar]);
    assert_eq!(p.title, DEFAULT_TITLE);
    assert_eq!(p.section_starts(), &[0]);
    assert!(p.explicit_permissions.public_view);
    assert_consistent(&p);
}

#[test]
fn test_declared_durations_only_update_start_times() {
    let p = Piece::new(PieceOptions {
        phrases: Some(vec![phrase(vec![fixed(0, 1.0)]), phrase(vec![fixed(1, 1.0)])]),
        dur_tot: Some(2.0),
        dur_array: Some(vec![0.25, 0.75]),
        ..Default::default()
    });
    assert_eq!(p.dur_array(), &[0.25, 0.75]);
    assert_eq!(p.phrases()[1].start_time, Some(0.5));

    let mismatched = Piece::new(PieceOptions {
        phrases: Some(vec![phrase(vec![fixed(0, 1.0)]), phrase(vec![fixed(1, 1.0)])]),
        dur_tot: Some(2.0),
        dur_array: Some(vec![1.0]),
        ..Default::default()
    });
    assert_eq!(mismatched.dur_array(), &[0.5, 0.5]);
}

#[test]
fn test_nan_trajectory_dropped() {
    let p = piece(vec![phrase(vec![fixed(0, 1.0), fixed(2, f64::NAN)])]);
    assert_eq!(p.phrases()[0].trajectories().len(), 1);
    assert_eq!(p.phrases()[0].dur_tot, 1.0);
    assert_eq!(p.dur_tot, 1.0);
    assert_eq!(p.dur_array(), &[1.0]);
}

#[test]
fn test_short_track_padded_with_silence() {
    let p = Piece::new(PieceOptions {
        phrase_grid: Some(vec![vec![phrase(vec![fixed(0, 1.0)])], Vec::new()]),
        instrumentation: Some(vec![Instrument::Sitar, Instrument::VocalMale]),
        ..Default::default()
    });
    assert_eq!(p.dur_tot, 1.0);
    let padded = p.track(1).unwrap();
    assert_eq!(padded.len(), 1);
    assert!(padded[0].trajectories()[0].is_silent());
    assert_eq!(padded[0].instrumentation, vec![Instrument::VocalMale]);
    assert_eq!(p.dur_array_grid[1], vec![1.0]);
    assert_consistent(&p);
}

#[test]
fn test_set_dur_tot_extends_silent_tail() {
    let mut p = piece(vec![phrase(vec![fixed(0, 1.0)]), phrase(vec![silent(1.0)])]);
    p.set_dur_tot(3.0).unwrap();
    assert_eq!(p.dur_tot, 3.0);
    assert_eq!(p.phrases().len(), 2);
    assert_eq!(p.phrases()[1].dur_tot, 2.0);
    assert_eq!(p.phrases()[1].trajectories().len(), 1);
    assert_eq!(p.phrases()[1].start_time, Some(1.0));
    assert_consistent(&p);
}

#[test]
fn test_set_dur_tot_appends_silence() {
    let mut p = piece(vec![phrase(vec![fixed(0, 1.0)]), phrase(vec![fixed(2, 1.0)])]);
    p.set_dur_tot(3.0).unwrap();
    let last = &p.phrases()[1];
    assert_eq!(last.trajectories().len(), 2);
    assert!(last.trajectories()[1].is_silent());
    assert_eq!(last.dur_tot, 2.0);
    assert!(matches!(p.set_dur_tot(1.0), Err(SwaraError::InvalidValue(_))));
    p.set_dur_tot(3.0).unwrap();
    assert_eq!(p.dur_tot, 3.0);
    assert_consistent(&p);
}

#[test]
fn test_set_dur_tot_rejects_non_finite() {
    let mut p = piece(vec![phrase(vec![fixed(0, 1.0)]), phrase(vec![fixed(2, 1.0), silent(1.0)])]);
    for bad in [f64::NAN, f64::INFINITY] {
        assert!(matches!(p.set_dur_tot(bad), Err(SwaraError::InvalidValue(_))));
    }
    assert_eq!(p.dur_tot, 3.0);
    assert_eq!(p.phrases()[1].trajectories().len(), 2);
    assert_eq!(p.phrases()[1].dur_tot, 2.0);
    assert_consistent(&p);
}

#[test]
fn test_timeline_lookups() {
    let p = two_phrase_piece();
    assert_eq!(p.traj_start_times(0).unwrap(), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(p.traj_from_time(1.5, 0).unwrap().pitches()[0].swara(), 4);
    assert_eq!(p.traj_from_time(-1.0, 0).unwrap().pitches()[0].swara(), 0);
    assert!(p.traj_from_time(10.0, 0).is_err());
    assert_eq!(p.phrase_idx_from_time(2.5, 0).unwrap(), 1);
    assert_eq!(p.phrase_idx_from_time(-1.0, 0).unwrap(), 0);
    assert_eq!(p.phrase_from_time(0.5, 0).unwrap().unique_id, p.phrases()[0].unique_id);
    assert_eq!(p.most_recent_traj(1.5, 0).unwrap().pitches()[0].swara(), 0);
    assert!(p.most_recent_traj(0.5, 0).is_err());
    assert!(p.track(3).is_err());
}

#[test]
fn test_chunked_trajs() {
    let p = two_phrase_piece();
    let chunks = p.chunked_trajs(0, 3.0).unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].len(), 3);
    assert_eq!(chunks[1].len(), 1);
    assert!(p.chunked_trajs(0, 0.0).is_err());
    assert_eq!(p.chunked_trajs(0, DEFAULT_CHUNK_DURATION).unwrap().len(), 1);
}

#[test]
fn test_display_walks() {
    let mut p = two_phrase_piece();
    let sargam = p.all_display_sargam(0).unwrap();
    let letters: Vec<&str> = sargam.iter().map(|s| s.sargam.as_str()).collect();
    assert_eq!(letters, vec!["S", "P", "G"]);
    assert_eq!(sargam[1].time, 1.0);

    let bols = p.all_display_bols(0).unwrap();
    assert_eq!(bols.len(), 3);
    assert_eq!(bols[0].bol, "da");

    let divs = p.all_phrase_divs(0).unwrap();
    assert_eq!(divs.len(), 1);
    assert_eq!(divs[0].kind, DivKind::Phrase);
    assert_eq!(divs[0].time, 2.0);
    p.section_starts_grid[0] = vec![0, 1];
    assert_eq!(p.all_phrase_divs(0).unwrap()[0].kind, DivKind::Section);

    assert!(matches!(p.all_display_vowels(0), Err(SwaraError::InvalidValue(_))));
    assert!(p.all_display_ending_consonants(0).unwrap().is_empty());
    assert_eq!(p.chunked_display_bols(0, 2.0).unwrap()[1].len(), 1);
}

#[test]
fn test_display_chikaris() {
    let mut ph = phrase(vec![fixed(0, 2.0)]);
    ph.chikaris_mut().insert("0.5".to_string(), Chikari::default());
    let p = piece(vec![phrase(vec![fixed(0, 1.0)]), ph]);
    let chikaris = p.all_display_chikaris(0).unwrap();
    assert_eq!(chikaris.len(), 1);
    assert_eq!(chikaris[0].time, 1.5);
    assert_eq!(chikaris[0].phrase_idx, 1);
    let freqs = p.chikari_freqs(0).unwrap();
    assert!(approx_eq!(f64, freqs[0], 261.63 * 4.0, epsilon = 1e-6));
}

#[test]
fn test_fixed_pitch_durations() {
    let p = piece(vec![phrase(vec![fixed(0, 1.0), fixed(4, 3.0), fixed(0, 1.0)])]);
    let durs = p.durations_of_fixed_pitches(0, OutputType::PitchNumber).unwrap();
    assert_eq!(durs[&PitchKey::Number(0)], 2.0);
    assert_eq!(durs[&PitchKey::Number(7)], 3.0);
    let props = p.proportions_of_fixed_pitches(0, OutputType::PitchNumber).unwrap();
    assert!(approx_eq!(f64, props[&PitchKey::Number(7)], 0.6, epsilon = 1e-9));
    assert_eq!(p.highest_pitch_number().unwrap(), Some(7));
    assert_eq!(p.lowest_pitch_number().unwrap(), Some(0));
    assert_eq!(p.all_pitch_numbers(false, 0).unwrap(), vec![0, 7, 0]);
}

#[test]
fn test_update_fundamental_fans_out() {
    let mut p = two_phrase_piece();
    p.update_fundamental(300.0);
    assert_eq!(p.raga().fundamental, 300.0);
    let sa = &p.phrases()[0].trajectories()[0];
    assert!(approx_eq!(f64, sa.freqs()[0], 300.0, epsilon = 1e-9));
    assert!(Rc::ptr_eq(p.raga(), p.phrases()[1].raga.as_ref().unwrap()));
}

#[test]
fn test_meters() {
    let mut p = two_phrase_piece();
    let first = Meter::new(vec![crate::meter::Layer::Uniform(4)], 0.0, 60.0, 1).unwrap();
    let uid = first.unique_id.clone();
    p.add_meter(first).unwrap();
    let overlapping = Meter::new(vec![crate::meter::Layer::Uniform(4)], 2.0, 60.0, 1).unwrap();
    assert!(matches!(p.add_meter(overlapping), Err(SwaraError::InvalidValue(_))));
    let touching = Meter::new(vec![crate::meter::Layer::Uniform(4)], 4.0, 60.0, 1).unwrap();
    p.add_meter(touching).unwrap();
    assert_eq!(p.meters().len(), 2);

    let pulse = p.pulse_from_id(&format!("{}-1", uid)).unwrap();
    assert_eq!(pulse.real_time, 1.0);
    assert_eq!(p.chunked_meters(2.0).unwrap()[0].len(), 1);

    p.remove_meter(uid.as_str()).unwrap();
    assert_eq!(p.meters().len(), 1);
    assert!(p.remove_meter(uid.as_str()).is_err());
}

#[test]
fn test_sections() {
    let mut p = piece(vec![
        phrase(vec![fixed(0, 1.0)]),
        phrase(vec![fixed(1, 1.0)]),
        phrase(vec![fixed(2, 1.0)]),
    ]);
    p.section_starts_grid[0] = vec![0, 2];
    p.section_cat_grid[0].push(SectionCategorization::default());
    p.ad_hoc_section_cat_grid[0].push(Vec::new());
    let sections = p.sections();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].phrases.len(), 2);
    assert_eq!(sections[1].trajectories().len(), 1);
    assert_eq!(p.s_idx_from_p_idx(1, 0).unwrap(), 0);
    assert_eq!(p.s_idx_from_p_idx(2, 0).unwrap(), 1);
}

#[test]
fn test_ad_hoc_categories_stripped() {
    let p = Piece::new(PieceOptions {
        ad_hoc_section_cat_grid: Some(vec![vec![vec!["".to_string(), "Tihai".to_string()]]]),
        ..Default::default()
    });
    assert_eq!(p.ad_hoc_section_cat_grid[0][0], vec!["Tihai".to_string()]);
}

#[test]
fn test_uid_lookups_and_groups() {
    let mut first = phrase(vec![fixed(0, 1.0), fixed(1, 1.0)]);
    let group_id = first.add_group(vec![0, 1]).unwrap().id.to_string();
    let p = piece(vec![first, phrase(vec![fixed(2, 1.0)])]);
    let phrase_uid = p.phrases()[1].unique_id.to_string();
    let traj_uid = p.phrases()[1].trajectories()[0].unique_id.to_string();
    assert_eq!(p.phrase_from_uid(&phrase_uid).unwrap().piece_idx, Some(1));
    assert_eq!(p.track_from_phrase_uid(&phrase_uid).unwrap(), 0);
    assert_eq!(p.traj_from_uid(&traj_uid, 0).unwrap().pitches()[0].swara(), 2);
    assert_eq!(p.track_from_traj_uid(&traj_uid).unwrap(), 0);
    assert!(matches!(p.phrase_from_uid("nope"), Err(SwaraError::NotFound { .. })));
    assert_eq!(p.p_idx_from_group(&group_id).unwrap(), 0);
    assert_eq!(p.all_groups(0).unwrap().len(), 1);
}

#[test]
fn test_assemblages_resolve_phrases() {
    let p = two_phrase_piece();
    let descriptor = AssemblageDescriptor {
        instrument: Instrument::Sitar,
        strands: vec![StrandDescriptor {
            label: "opening".to_string(),
            phrase_ids: vec![p.phrases()[0].unique_id.to_string()],
            id: "s1".to_string(),
        }],
        name: "motifs".to_string(),
        id: "a1".to_string(),
        loose_phrase_ids: vec![p.phrases()[1].unique_id.to_string()],
    };
    let p = Piece {
        assemblage_descriptors: vec![descriptor],
        ..p
    };
    let assemblages = p.assemblages().unwrap();
    assert_eq!(assemblages.len(), 1);
    assert_eq!(assemblages[0].phrases().len(), 2);
    assert_eq!(assemblages[0].loose_phrases().len(), 1);
}

#[test]
fn test_json_round_trip() {
    let mut p = two_phrase_piece();
    p.add_meter(Meter::new(vec![crate::meter::Layer::Uniform(4)], 0.0, 60.0, 1).unwrap())
        .unwrap();
    p.id = Some("piece-1".to_string());
    let out = p.to_json().unwrap();
    assert_eq!(out["_id"], json!("piece-1"));
    assert_eq!(out["durTot"], json!(4.0));
    assert_eq!(out["sectionStarts"], json!([0]));
    assert!(out["phraseGrid"][0].is_array());
    let back = Piece::from_json(out.clone()).unwrap();
    assert_eq!(back.to_json().unwrap(), out);
    assert_eq!(back.dur_tot, p.dur_tot);
}

#[test]
fn test_declared_grid_survives_round_trip() {
    let p = Piece::new(PieceOptions {
        phrases: Some(vec![phrase(vec![fixed(0, 1.0)]), phrase(vec![fixed(1, 1.0)])]),
        dur_tot: Some(2.0),
        dur_array: Some(vec![0.25, 0.75]),
        ..Default::default()
    });
    let out = p.to_json().unwrap();
    assert_eq!(out["durArrayGrid"], json!([[0.25, 0.75]]));
    let back = Piece::from_json(out.clone()).unwrap();
    assert_eq!(back.dur_array(), &[0.25, 0.75]);
    assert_eq!(back.phrases()[1].start_time, Some(0.5));
    assert_eq!(back.to_json().unwrap(), out);

    // a grid the phrases no longer fill is rederived
    let mut short = out;
    short["durTot"] = json!(3.0);
    let rederived = Piece::from_json(short).unwrap();
    assert_eq!(rederived.dur_tot, 2.0);
    assert_eq!(rederived.dur_array(), &[0.5, 0.5]);
}

#[test]
fn test_decode_fixups() {
    let mut slid = fixed(0, 1.0);
    slid.set_articulation(0.0, Articulation::named("slide"));
    let p = piece(vec![phrase(vec![slid, silent(1.0), silent(2.0), fixed(1, 1.0)])]);
    let mut doc = p.to_json().unwrap();
    doc["sectionStarts"] = json!([0, 0]);
    doc["sectionStartsGrid"] = json!([[0, 0]]);
    let back = Piece::from_json(doc).unwrap();
    let trajs = back.phrases()[0].trajectories();
    assert_eq!(trajs.len(), 3);
    assert_eq!(trajs[0].articulation("0.00").unwrap().name, "pluck");
    assert_eq!(trajs[1].dur_tot, 3.0);
    assert_eq!(back.dur_tot, 5.0);
    assert_eq!(back.section_starts(), &[0]);
}

#[test]
fn test_dates_decode_in_both_forms() {
    let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut doc = Piece::default().to_json().unwrap();
    doc["dateCreated"] = json!("2024-01-01T00:00:00.000Z");
    doc["dateModified"] = json!({ "$date": { "$numberLong": "1704067200000" } });
    let p = Piece::from_json(doc.clone()).unwrap();
    assert_eq!(p.date_created, instant);
    assert_eq!(p.date_modified, instant);
    assert_eq!(p.to_json().unwrap()["dateModified"], json!("2024-01-01T00:00:00.000Z"));

    doc["dateModified"] = json!({ "$date": 1704067200000i64 });
    assert_eq!(Piece::from_json(doc.clone()).unwrap().date_modified, instant);
    doc["dateModified"] = json!(17);
    assert!(Piece::from_json(doc).is_err());
}

#[test]
fn test_realign_pitches_keeps_durations() {
    let mut p = two_phrase_piece();
    p.realign_pitches().unwrap();
    assert_eq!(p.dur_tot, 4.0);
    assert_eq!(p.traj_idxs_grid().len(), 1);
}
