use std::rc::Rc;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::{Piece, PieceOptions};
use crate::articulation::START_KEY;
use crate::assemblage::AssemblageDescriptor;
use crate::error::{Result, SwaraError};
use crate::instrument::Instrument;
use crate::meter::Meter;
use crate::phrase::Phrase;
use crate::raga::Raga;
use crate::section::SectionCategorization;

/// Who besides the owner may see or edit a piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplicitPermissions {
    #[serde(default)]
    pub edit: Vec<String>,
    #[serde(default)]
    pub view: Vec<String>,
    #[serde(default = "public_by_default")]
    pub public_view: bool,
}

fn public_by_default() -> bool {
    true
}

impl Default for ExplicitPermissions {
    fn default() -> Self {
        ExplicitPermissions {
            edit: Vec::new(),
            view: Vec::new(),
            public_view: true,
        }
    }
}

/// The span of the source recording a piece transcribes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcerptRange {
    pub start: f64,
    pub end: f64,
}

/// `2024-01-01T00:00:00.000Z`
pub(crate) fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// An ISO-8601 string, or the wrapped `{"$date": ...}` form holding an
/// ISO string, epoch millis, or `{"$numberLong": "<millis>"}`.
pub(crate) fn parse_date(value: &Value) -> Result<DateTime<Utc>> {
    let bad = || SwaraError::Document(format!("unrecognized date: {}", value));
    let from_millis = |ms: i64| Utc.timestamp_millis_opt(ms).single().ok_or_else(bad);
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|_| bad()),
        Value::Object(map) => match map.get("$date") {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| bad()),
            Some(Value::Number(n)) => from_millis(n.as_i64().ok_or_else(bad)?),
            Some(Value::Object(inner)) => {
                let ms = inner
                    .get("$numberLong")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(bad)?;
                from_millis(ms)
            }
            _ => Err(bad()),
        },
        _ => Err(bad()),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PieceWire<'a> {
    raga: &'a Raga,
    dur_tot: f64,
    dur_array: &'a [f64],
    title: &'a str,
    date_created: String,
    date_modified: String,
    location: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(rename = "audioID", skip_serializing_if = "Option::is_none")]
    audio_id: Option<&'a str>,
    #[serde(rename = "audio_DB_ID", skip_serializing_if = "Option::is_none")]
    audio_db_id: Option<&'a str>,
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    permissions: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(rename = "family_name", skip_serializing_if = "Option::is_none")]
    family_name: Option<&'a str>,
    #[serde(rename = "given_name", skip_serializing_if = "Option::is_none")]
    given_name: Option<&'a str>,
    section_starts: &'a [usize],
    instrumentation: &'a [Instrument],
    meters: &'a [Meter],
    section_categorization: &'a [SectionCategorization],
    explicit_permissions: &'a ExplicitPermissions,
    #[serde(skip_serializing_if = "Option::is_none")]
    soloist: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    solo_instrument: Option<&'a str>,
    phrase_grid: &'a [Vec<Phrase>],
    dur_array_grid: &'a [Vec<f64>],
    section_starts_grid: &'a [Vec<usize>],
    section_cat_grid: &'a [Vec<SectionCategorization>],
    #[serde(skip_serializing_if = "Option::is_none")]
    excerpt_range: Option<&'a ExcerptRange>,
    ad_hoc_section_cat_grid: &'a [Vec<Vec<String>>],
    assemblage_descriptors: &'a [AssemblageDescriptor],
}

impl Serialize for Piece {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        PieceWire {
            raga: &self.raga,
            dur_tot: self.dur_tot,
            dur_array: self.dur_array(),
            title: &self.title,
            date_created: format_date(&self.date_created),
            date_modified: format_date(&self.date_modified),
            location: &self.location,
            id: self.id.as_deref(),
            audio_id: self.audio_id.as_deref(),
            audio_db_id: self.audio_db_id.as_deref(),
            user_id: self.user_id.as_deref(),
            permissions: self.permissions.as_deref(),
            name: self.name.as_deref(),
            family_name: self.family_name.as_deref(),
            given_name: self.given_name.as_deref(),
            section_starts: self.section_starts(),
            instrumentation: &self.instrumentation,
            meters: &self.meters,
            section_categorization: &self.section_cat_grid[0],
            explicit_permissions: &self.explicit_permissions,
            soloist: self.soloist.as_deref(),
            solo_instrument: self.solo_instrument.as_deref(),
            phrase_grid: &self.phrase_grid,
            dur_array_grid: &self.dur_array_grid,
            section_starts_grid: &self.section_starts_grid,
            section_cat_grid: &self.section_cat_grid,
            excerpt_range: self.excerpt_range.as_ref(),
            ad_hoc_section_cat_grid: &self.ad_hoc_section_cat_grid,
            assemblage_descriptors: &self.assemblage_descriptors,
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PieceDocument {
    raga: Option<Raga>,
    phrases: Option<Vec<Phrase>>,
    phrase_grid: Option<Vec<Vec<Phrase>>>,
    dur_tot: Option<f64>,
    dur_array: Option<Vec<f64>>,
    dur_array_grid: Option<Vec<Vec<f64>>>,
    instrumentation: Option<Vec<Instrument>>,
    title: Option<String>,
    date_created: Option<Value>,
    date_modified: Option<Value>,
    location: Option<String>,
    #[serde(rename = "_id", alias = "id")]
    id: Option<String>,
    #[serde(rename = "audioID")]
    audio_id: Option<String>,
    #[serde(rename = "audio_DB_ID")]
    audio_db_id: Option<String>,
    #[serde(rename = "userID")]
    user_id: Option<String>,
    permissions: Option<String>,
    name: Option<String>,
    #[serde(rename = "family_name")]
    family_name: Option<String>,
    #[serde(rename = "given_name")]
    given_name: Option<String>,
    section_starts: Option<Vec<usize>>,
    section_starts_grid: Option<Vec<Vec<usize>>>,
    section_categorization: Option<Vec<SectionCategorization>>,
    section_cat_grid: Option<Vec<Vec<SectionCategorization>>>,
    ad_hoc_section_cat_grid: Option<Vec<Vec<Vec<String>>>>,
    meters: Option<Vec<Meter>>,
    explicit_permissions: Option<ExplicitPermissions>,
    soloist: Option<String>,
    solo_instrument: Option<String>,
    excerpt_range: Option<ExcerptRange>,
    assemblage_descriptors: Option<Vec<AssemblageDescriptor>>,
}

impl PieceDocument {
    fn into_piece(self) -> Result<Piece> {
        let date_created = self.date_created.as_ref().map(parse_date).transpose()?;
        let date_modified = self.date_modified.as_ref().map(parse_date).transpose()?;
        let mut piece = Piece::new(PieceOptions {
            phrases: self.phrases,
            phrase_grid: self.phrase_grid,
            dur_tot: self.dur_tot,
            dur_array: self.dur_array,
            dur_array_grid: self.dur_array_grid,
            raga: Some(Rc::new(self.raga.unwrap_or_default())),
            instrumentation: self.instrumentation,
            title: self.title,
            date_created,
            date_modified,
            location: self.location,
            id: self.id,
            audio_id: self.audio_id,
            audio_db_id: self.audio_db_id,
            user_id: self.user_id,
            permissions: self.permissions,
            name: self.name,
            family_name: self.family_name,
            given_name: self.given_name,
            section_starts: self.section_starts,
            section_starts_grid: self.section_starts_grid,
            section_categorization: self.section_categorization,
            section_cat_grid: self.section_cat_grid,
            ad_hoc_section_cat_grid: self.ad_hoc_section_cat_grid,
            meters: self.meters,
            explicit_permissions: self.explicit_permissions,
            soloist: self.soloist,
            solo_instrument: self.solo_instrument,
            excerpt_range: self.excerpt_range,
            assemblage_descriptors: self.assemblage_descriptors,
        });
        piece.normalize_document();
        Ok(piece)
    }
}

impl<'de> Deserialize<'de> for Piece {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        PieceDocument::deserialize(deserializer)?
            .into_piece()
            .map_err(serde::de::Error::custom)
    }
}

impl Piece {
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild a piece from its wire document. Legacy slides at a
    /// trajectory's start become plucks and silent runs are merged. A
    /// declared duration grid is kept while the phrases still fill it;
    /// otherwise it is rederived.
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    fn normalize_document(&mut self) {
        for phrase in self.phrase_grid.iter_mut().flatten() {
            for traj in phrase.trajectories_mut() {
                if let Some(art) = traj.articulation_mut(START_KEY).filter(|a| a.name == "slide") {
                    art.name = "pluck".to_string();
                    debug!("converted opening slide to pluck on {}", traj.unique_id);
                }
            }
            phrase.consolidate_silent_trajs();
        }
        if self.tracks_fill_dur_tot() {
            self.update_start_times();
        } else {
            debug!("rederiving durations of decoded piece");
            self.dur_array_from_phrases();
        }
        for starts in &mut self.section_starts_grid {
            starts.dedup();
        }
    }
}
