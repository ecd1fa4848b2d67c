//! Integration tests for the transcription model
//!
//! Loads a stored transcription, checks the normalization applied on
//! decode, and round-trips it through the wire format and a store.

use chrono::{TimeZone, Utc};
use float_cmp::approx_eq;
use pretty_assertions::assert_eq;
use swara::piece::DivKind;
use swara::{load_piece, DocumentStore, Instrument, MemoryStore, Piece, Settings, UserProfile};

const FIXTURE: &str = include_str!("fixtures/piece.json");

fn fixture() -> Piece {
    load_piece(FIXTURE).expect("fixture should decode")
}

#[test]
fn test_fixture_metadata() {
    let piece = fixture();
    assert_eq!(piece.id.as_deref(), Some("65a1f0c2e4b0a1b2c3d4e5f6"));
    assert_eq!(piece.title, "Yaman alap excerpt");
    assert_eq!(piece.raga().name, "Yaman");
    assert_eq!(piece.instrumentation, vec![Instrument::Sitar, Instrument::VocalMale]);
    assert_eq!(piece.date_created, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(piece.date_modified, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    assert_eq!(piece.explicit_permissions.edit, vec!["u-7".to_string()]);
    assert_eq!(piece.excerpt_range.map(|r| r.end), Some(18.5));
}

#[test]
fn test_decode_normalizes_document() {
    let piece = fixture();

    // the silent pair in the first phrase is merged
    let first = &piece.phrases()[0];
    assert_eq!(first.trajectories().len(), 3);
    assert_eq!(first.trajectories()[2].dur_tot, 1.0);
    assert_eq!(first.trajectories()[0].articulation("0.00").unwrap().name, "pluck");

    assert_eq!(piece.section_starts(), &[0, 1]);
    assert_eq!(piece.ad_hoc_section_cat_grid[0][0], vec!["opening".to_string()]);

    assert_eq!(piece.dur_tot, 6.0);
    assert_eq!(piece.dur_array_grid, vec![vec![0.5, 0.5], vec![1.0]]);

    // the vocal track is padded to the piece length
    let vocal = piece.track(1).unwrap();
    assert_eq!(vocal.len(), 1);
    assert_eq!(vocal[0].trajectories().len(), 3);
    assert!(vocal[0].trajectories()[2].is_silent());
    assert_eq!(vocal[0].dur_tot, 6.0);
}

#[test]
fn test_timeline_and_displays() {
    let piece = fixture();
    assert_eq!(piece.phrases()[1].start_time, Some(3.0));
    assert_eq!(piece.traj_from_time(3.5, 0).unwrap().unique_id.as_str(), "t-5");
    assert_eq!(piece.phrase_idx_from_time(4.0, 0).unwrap(), 1);

    let divs = piece.all_phrase_divs(0).unwrap();
    assert_eq!(divs.len(), 1);
    assert_eq!(divs[0].kind, DivKind::Section);

    let chikaris = piece.all_display_chikaris(0).unwrap();
    assert_eq!(chikaris.len(), 1);
    assert!(approx_eq!(f64, chikaris[0].time, 3.25, epsilon = 1e-9));

    let vowels = piece.all_display_vowels(1).unwrap();
    assert_eq!(vowels.len(), 2);
    assert_eq!(vowels[1].time, 2.0);
    assert_eq!(vowels[1].english_text, "ki");
    assert!(piece.all_display_vowels(0).is_err());

    assert_eq!(piece.all_display_bols(0).unwrap().len(), 4);
    assert_eq!(piece.p_idx_from_group("g-1").unwrap(), 1);
}

#[test]
fn test_meter_pulses() {
    let piece = fixture();
    let half = piece.pulse_from_id("m-1-1").unwrap();
    assert_eq!(half.real_time, 0.5);
    assert_eq!(half.layer, 1);
    assert_eq!(piece.pulse_from_id("m-1-2").unwrap().layer, 0);
    assert!(piece.pulse_from_id("m-1-8").is_none());
}

#[test]
fn test_wire_round_trip() {
    let piece = fixture();
    let out = piece.to_json().unwrap();
    assert_eq!(out["dateModified"], serde_json::json!("2024-02-01T00:00:00.000Z"));
    assert_eq!(out["sectionStarts"], serde_json::json!([0, 1]));
    let again = Piece::from_json(out.clone()).unwrap();
    assert_eq!(again.to_json().unwrap(), out);
}

#[test]
fn test_store_round_trip() {
    let mut store = MemoryStore::new();
    let mut piece = fixture();
    let owner = UserProfile::from_json(serde_json::json!({ "_id": "u-9", "name": "Annapurna Devi" }))
        .unwrap();
    piece.assign_owner(&owner);
    let id = store.store(&piece).unwrap();
    assert_eq!(id, "65a1f0c2e4b0a1b2c3d4e5f6");
    let listed = store.list_by_owner("u-9", Default::default()).unwrap();
    assert_eq!(listed.len(), 1);
    let loaded = store.load(&id).unwrap();
    assert_eq!(loaded.to_json().unwrap(), piece.to_json().unwrap());
}

#[test]
fn test_chunks_follow_settings() {
    let piece = fixture();
    let settings = Settings::from_yaml_str("chunk-duration: 2.5").unwrap();
    let chunks = piece.chunked_trajs(0, settings.chunk_duration).unwrap();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| !c.is_empty()));
}
