//! Mapping-key normalization for incoming documents.
//!
//! Trajectory objects reach us either camelCased (browser editor) or
//! snake_cased (scripting clients). Decoding runs them through
//! [`decamelize`] first so a single set of field names applies.

use convert_case::{Boundary, Case, Converter};
use serde_json::{Map, Value};

/// Rewrite every mapping key in `value` from camelCase to snake_case,
/// recursing through nested objects and arrays.
///
/// Array elements and scalar values are never altered. Keys that are not
/// plain identifiers (articulation positions such as `"0.25"`, labels with
/// spaces) pass through unchanged.
pub fn decamelize(value: Value) -> Value {
    let converter = Converter::new()
        .set_boundaries(&[Boundary::LowerUpper, Boundary::Acronym, Boundary::DigitUpper])
        .to_case(Case::Snake);
    rewrite(value, &converter)
}

fn rewrite(value: Value, converter: &Converter) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                let key = if is_identifier(&key) {
                    converter.convert(&key)
                } else {
                    key
                };
                out.insert(key, rewrite(inner, converter));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| rewrite(v, converter)).collect())
        }
        other => other,
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_rewrites_nested_keys() {
        let input = json!({
            "durTot": 1.5,
            "vibObj": { "vertOffset": 0, "initUp": true },
            "pitches": [{ "logOffset": 0.1, "swara": 2 }],
            "startConsonantEngTrans": "k",
        });
        let expected = json!({
            "dur_tot": 1.5,
            "vib_obj": { "vert_offset": 0, "init_up": true },
            "pitches": [{ "log_offset": 0.1, "swara": 2 }],
            "start_consonant_eng_trans": "k",
        });
        assert_eq!(decamelize(input), expected);
    }

    #[test]
    fn test_acronyms_and_digits() {
        let out = decamelize(json!({ "fundID12": 220.0, "audioID": "x", "uniqueId": "u" }));
        assert_eq!(out, json!({ "fund_id12": 220.0, "audio_id": "x", "unique_id": "u" }));
    }

    #[test]
    fn test_snake_case_is_stable() {
        let input = json!({ "dur_array": [0.5, 0.5], "group_id": null });
        assert_eq!(decamelize(input.clone()), input);
    }

    #[test]
    fn test_values_and_position_keys_untouched() {
        let input = json!({
            "articulations": { "0.00": { "name": "pluck", "strokeNickname": "da" } },
            "tags": ["camelCaseTag"],
            "name": "Bend: Simple",
        });
        let expected = json!({
            "articulations": { "0.00": { "name": "pluck", "stroke_nickname": "da" } },
            "tags": ["camelCaseTag"],
            "name": "Bend: Simple",
        });
        assert_eq!(decamelize(input), expected);
    }
}
