use serde::{Deserialize, Serialize};

/// Position key for the start of a trajectory.
pub const START_KEY: &str = "0.00";
/// Position key for the end of a trajectory.
pub const END_KEY: &str = "1.00";

/// Marker attached to a trajectory at a normalized position: a pluck,
/// hammer-on, slide, sung consonant and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"), from = "ArticulationDocument")]
pub struct Articulation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hindi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eng_trans: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_nickname: Option<String>,
}

impl Default for Articulation {
    fn default() -> Self {
        Articulation::named("pluck")
    }
}

impl Articulation {
    pub fn named(name: &str) -> Self {
        Articulation {
            name: name.to_string(),
            stroke: None,
            hindi: None,
            ipa: None,
            eng_trans: None,
            stroke_nickname: None,
        }
    }

    /// A plucked stroke; `d` and `r` get their bol nicknames.
    pub fn pluck(stroke: &str) -> Self {
        Articulation {
            stroke: Some(stroke.to_string()),
            ..Articulation::named("pluck")
        }
        .with_default_nickname()
    }

    pub fn consonant(
        iso: &str,
        hindi: Option<&str>,
        ipa: Option<&str>,
        eng_trans: Option<&str>,
    ) -> Self {
        Articulation {
            stroke: Some(iso.to_string()),
            hindi: hindi.map(str::to_string),
            ipa: ipa.map(str::to_string),
            eng_trans: eng_trans.map(str::to_string),
            ..Articulation::named("consonant")
        }
    }

    pub fn is_consonant(&self) -> bool {
        self.name == "consonant"
    }

    fn with_default_nickname(mut self) -> Self {
        if self.stroke_nickname.is_none() {
            self.stroke_nickname = match self.stroke.as_deref() {
                Some("d") => Some("da".to_string()),
                Some("r") => Some("ra".to_string()),
                _ => None,
            };
        }
        self
    }
}

/// Canonical two-decimal key for a normalized position.
pub fn position_key(x: f64) -> String {
    format!("{:.2}", x)
}

/// Re-render a stored key (`"0"`, `"0.5"`, `"0.50"`) in canonical form;
/// keys that are not numbers are returned unchanged.
pub fn canonical_key(key: &str) -> String {
    match key.trim().parse::<f64>() {
        Ok(x) => position_key(x),
        Err(_) => key.to_string(),
    }
}

#[derive(Deserialize)]
struct ArticulationDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    stroke: Option<String>,
    #[serde(default)]
    hindi: Option<String>,
    #[serde(default)]
    ipa: Option<String>,
    #[serde(default, alias = "engTrans")]
    eng_trans: Option<String>,
    #[serde(default, alias = "strokeNickname")]
    stroke_nickname: Option<String>,
}

impl From<ArticulationDocument> for Articulation {
    fn from(doc: ArticulationDocument) -> Self {
        Articulation {
            name: doc.name.unwrap_or_else(|| "pluck".to_string()),
            stroke: doc.stroke,
            hindi: doc.hindi,
            ipa: doc.ipa,
            eng_trans: doc.eng_trans,
            stroke_nickname: doc.stroke_nickname,
        }
        .with_default_nickname()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pluck_nicknames() {
        assert_eq!(Articulation::pluck("d").stroke_nickname.as_deref(), Some("da"));
        assert_eq!(Articulation::pluck("r").stroke_nickname.as_deref(), Some("ra"));
        assert_eq!(Articulation::pluck("x").stroke_nickname, None);
    }

    #[test]
    fn test_position_keys() {
        assert_eq!(position_key(0.0), START_KEY);
        assert_eq!(position_key(1.0), END_KEY);
        assert_eq!(position_key(1.0 / 3.0), "0.33");
        assert_eq!(canonical_key("0"), "0.00");
        assert_eq!(canonical_key("0.5"), "0.50");
        assert_eq!(canonical_key("0.25"), "0.25");
        assert_eq!(canonical_key("start"), "start");
    }

    #[test]
    fn test_decodes_either_casing() {
        let a: Articulation =
            serde_json::from_value(json!({ "name": "consonant", "stroke": "ka", "engTrans": "k" }))
                .unwrap();
        assert_eq!(a.eng_trans.as_deref(), Some("k"));
        let b: Articulation = serde_json::from_value(json!({ "stroke": "d" })).unwrap();
        assert_eq!(b.name, "pluck");
        assert_eq!(b.stroke_nickname.as_deref(), Some("da"));
        let out = serde_json::to_value(&b).unwrap();
        assert_eq!(out, json!({ "name": "pluck", "stroke": "d", "strokeNickname": "da" }));
    }
}
