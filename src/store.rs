//! Boundary to wherever transcriptions are kept.
//!
//! Documents cross this boundary in wire form. [`MemoryStore`] keeps them
//! in a map; a networked client would implement [`DocumentStore`] against
//! the transcription service instead.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SwaraError};
use crate::piece::Piece;
pub use crate::piece::ExplicitPermissions;
use crate::uid::UniqueId;

/// Kinds of record whose visibility can be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    Transcription,
    AudioRecording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Title,
    DateCreated,
    DateModified,
}

impl SortKey {
    fn field(&self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::DateCreated => "dateCreated",
            SortKey::DateModified => "dateModified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOrder {
    pub key: SortKey,
    pub descending: bool,
}

pub trait DocumentStore {
    fn get_piece(&self, id: &str) -> Result<Value>;

    /// Store `doc`, assigning an `_id` when it has none. Returns the id.
    fn save_piece(&mut self, doc: Value) -> Result<String>;

    fn list_by_owner(&self, owner: &str, order: ListOrder) -> Result<Vec<Value>>;

    fn update_visibility(
        &mut self,
        kind: ArtifactKind,
        id: &str,
        permissions: &ExplicitPermissions,
    ) -> Result<()>;

    fn load(&self, id: &str) -> Result<Piece> {
        Piece::from_json(self.get_piece(id)?)
    }

    fn store(&mut self, piece: &Piece) -> Result<String> {
        self.save_piece(piece.to_json()?)
    }
}

/// Transcriptions held in memory, keyed by `_id`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pieces: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    let text = |v: &Value| v.get(field).and_then(Value::as_str).map(str::to_owned);
    text(a).cmp(&text(b))
}

impl DocumentStore for MemoryStore {
    fn get_piece(&self, id: &str) -> Result<Value> {
        self.pieces
            .get(id)
            .cloned()
            .ok_or_else(|| SwaraError::not_found("transcription", id))
    }

    fn save_piece(&mut self, mut doc: Value) -> Result<String> {
        let map = doc
            .as_object_mut()
            .ok_or_else(|| SwaraError::Document("a transcription must be an object".to_string()))?;
        let id = match map.get("_id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = UniqueId::new_v4().to_string();
                map.insert("_id".to_string(), Value::String(id.clone()));
                id
            }
        };
        debug!("saving transcription {}", id);
        self.pieces.insert(id.clone(), doc);
        Ok(id)
    }

    fn list_by_owner(&self, owner: &str, order: ListOrder) -> Result<Vec<Value>> {
        let mut docs: Vec<Value> = self
            .pieces
            .values()
            .filter(|d| d.get("userID").and_then(Value::as_str) == Some(owner))
            .cloned()
            .collect();
        docs.sort_by(|a, b| {
            let ord = compare_field(a, b, order.key.field());
            if order.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Ok(docs)
    }

    fn update_visibility(
        &mut self,
        kind: ArtifactKind,
        id: &str,
        permissions: &ExplicitPermissions,
    ) -> Result<()> {
        if kind != ArtifactKind::Transcription {
            return Err(SwaraError::not_found("audio recording", id));
        }
        let doc = self
            .pieces
            .get_mut(id)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| SwaraError::not_found("transcription", id))?;
        doc.insert("explicitPermissions".to_string(), serde_json::to_value(permissions)?);
        Ok(())
    }
}

#[derive(Deserialize)]
struct ProfileDocument {
    #[serde(rename = "_id")]
    id: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

#[derive(Deserialize)]
struct TokenFile {
    profile: Option<Value>,
    user: Option<Value>,
}

/// The signed-in user, as returned by the sign-in exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl UserProfile {
    /// The id is the service's `_id`, else the identity provider's `sub`.
    pub fn from_json(value: Value) -> Result<Self> {
        let doc: ProfileDocument = serde_json::from_value(value)?;
        let user_id = doc
            .id
            .or(doc.sub)
            .filter(|id| !id.is_empty())
            .ok_or(SwaraError::Missing("user id"))?;
        Ok(UserProfile {
            user_id,
            email: doc.email,
            name: doc.name,
            given_name: doc.given_name,
            family_name: doc.family_name,
        })
    }

    /// Read the profile saved beside a sign-in token.
    pub fn from_token_file(path: impl AsRef<Path>) -> Result<Self> {
        let token: TokenFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        let profile = token
            .profile
            .or(token.user)
            .ok_or(SwaraError::Missing("profile in token file"))?;
        UserProfile::from_json(profile)
    }
}

impl Piece {
    /// Stamp the piece with its owner's id and names.
    pub fn assign_owner(&mut self, profile: &UserProfile) {
        self.user_id = Some(profile.user_id.clone());
        self.name = profile.name.clone();
        self.given_name = profile.given_name.clone();
        self.family_name = profile.family_name.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn profile() -> UserProfile {
        UserProfile::from_json(json!({
            "sub": "g-123",
            "email": "a@example.com",
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace"
        }))
        .unwrap()
    }

    #[test]
    fn test_profile_id_fallback() {
        assert_eq!(profile().user_id, "g-123");
        let with_id = UserProfile::from_json(json!({ "_id": "u-1", "sub": "g-123" })).unwrap();
        assert_eq!(with_id.user_id, "u-1");
        assert!(matches!(
            UserProfile::from_json(json!({ "email": "x" })),
            Err(SwaraError::Missing(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let mut store = MemoryStore::new();
        let mut piece = Piece::default();
        piece.assign_owner(&profile());
        let id = store.store(&piece).unwrap();
        assert_eq!(store.len(), 1);
        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
        assert_eq!(loaded.user_id.as_deref(), Some("g-123"));
        assert_eq!(loaded.given_name.as_deref(), Some("Ada"));
        assert!(store.get_piece("missing").is_err());
        assert!(store.save_piece(json!([1, 2])).is_err());
    }

    #[test]
    fn test_list_by_owner_sorted() {
        let mut store = MemoryStore::new();
        for (title, owner) in [("b", "u1"), ("a", "u1"), ("c", "u2")] {
            store
                .save_piece(json!({ "title": title, "userID": owner }))
                .unwrap();
        }
        let titles = |docs: Vec<Value>| -> Vec<String> {
            docs.iter()
                .map(|d| d["title"].as_str().unwrap().to_string())
                .collect()
        };
        let asc = store.list_by_owner("u1", ListOrder::default()).unwrap();
        assert_eq!(titles(asc), vec!["a", "b"]);
        let desc = store
            .list_by_owner(
                "u1",
                ListOrder {
                    key: SortKey::Title,
                    descending: true,
                },
            )
            .unwrap();
        assert_eq!(titles(desc), vec!["b", "a"]);
    }

    #[test]
    fn test_update_visibility() {
        let mut store = MemoryStore::new();
        let id = store.store(&Piece::default()).unwrap();
        let perms = ExplicitPermissions {
            edit: vec!["u2".to_string()],
            view: Vec::new(),
            public_view: false,
        };
        store
            .update_visibility(ArtifactKind::Transcription, &id, &perms)
            .unwrap();
        assert_eq!(store.load(&id).unwrap().explicit_permissions, perms);
        assert!(store
            .update_visibility(ArtifactKind::AudioRecording, &id, &perms)
            .is_err());
        assert!(store
            .update_visibility(ArtifactKind::Transcription, "nope", &perms)
            .is_err());
    }
}
