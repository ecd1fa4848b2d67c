use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SwaraError;
use crate::trajectory::Shape;

/// Instrument carried by one track of a piece.
///
/// Serialized as the display code used by the editor, e.g. `"Vocal (M)"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Instrument {
    #[default]
    Sitar,
    Sarangi,
    #[serde(rename = "Vocal (M)")]
    VocalMale,
    #[serde(rename = "Vocal (F)")]
    VocalFemale,
    Bansuri,
    Esraj,
    Rabab,
    Santoor,
    Sarod,
    Shehnai,
    Surbahar,
    #[serde(rename = "Veena (Saraswati)")]
    VeenaSaraswati,
    #[serde(rename = "Veena (Vichitra)")]
    VeenaVichitra,
    #[serde(rename = "Veena (Rudra Bin)")]
    VeenaRudraBin,
    Violin,
    Harmonium,
}

impl Instrument {
    pub const ALL: [Instrument; 16] = [
        Instrument::Sitar,
        Instrument::Sarangi,
        Instrument::VocalMale,
        Instrument::VocalFemale,
        Instrument::Bansuri,
        Instrument::Esraj,
        Instrument::Rabab,
        Instrument::Santoor,
        Instrument::Sarod,
        Instrument::Shehnai,
        Instrument::Surbahar,
        Instrument::VeenaSaraswati,
        Instrument::VeenaVichitra,
        Instrument::VeenaRudraBin,
        Instrument::Violin,
        Instrument::Harmonium,
    ];

    /// Wire code for this instrument.
    pub fn code(&self) -> &'static str {
        match self {
            Instrument::Sitar => "Sitar",
            Instrument::Sarangi => "Sarangi",
            Instrument::VocalMale => "Vocal (M)",
            Instrument::VocalFemale => "Vocal (F)",
            Instrument::Bansuri => "Bansuri",
            Instrument::Esraj => "Esraj",
            Instrument::Rabab => "Rabab",
            Instrument::Santoor => "Santoor",
            Instrument::Sarod => "Sarod",
            Instrument::Shehnai => "Shehnai",
            Instrument::Surbahar => "Surbahar",
            Instrument::VeenaSaraswati => "Veena (Saraswati)",
            Instrument::VeenaVichitra => "Veena (Vichitra)",
            Instrument::VeenaRudraBin => "Veena (Rudra Bin)",
            Instrument::Violin => "Violin",
            Instrument::Harmonium => "Harmonium",
        }
    }

    pub fn is_vocal(&self) -> bool {
        matches!(self, Instrument::VocalMale | Instrument::VocalFemale)
    }

    /// Trajectory shapes the editor offers for this instrument.
    pub fn possible_shapes(&self) -> Vec<Shape> {
        let ids: &[u8] = match self {
            Instrument::Harmonium => &[0, 12, 13],
            Instrument::VocalMale
            | Instrument::VocalFemale
            | Instrument::Bansuri
            | Instrument::Sarangi
            | Instrument::Violin => &[0, 1, 2, 3, 4, 5, 6, 12, 13],
            _ => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13],
        };
        ids.iter().filter_map(|id| Shape::try_from(*id).ok()).collect()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Instrument {
    type Err = SwaraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Instrument::ALL
            .iter()
            .copied()
            .find(|i| i.code() == s)
            .ok_or_else(|| SwaraError::InvalidValue(format!("unknown instrument: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for inst in Instrument::ALL {
            let json = serde_json::to_value(inst).unwrap();
            assert_eq!(json, serde_json::Value::String(inst.code().to_string()));
            let back: Instrument = serde_json::from_value(json).unwrap();
            assert_eq!(back, inst);
            assert_eq!(inst.code().parse::<Instrument>().unwrap(), inst);
        }
    }

    #[test]
    fn test_unknown_code() {
        assert!("Tabla".parse::<Instrument>().is_err());
    }

    #[test]
    fn test_vocal_shapes_exclude_krintin() {
        let shapes = Instrument::VocalFemale.possible_shapes();
        assert!(shapes.contains(&Shape::Yoyo));
        assert!(!shapes.contains(&Shape::Krintin));
        assert_eq!(Instrument::Sitar.possible_shapes().len(), 14);
    }
}
