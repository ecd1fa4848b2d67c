use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Identifier carried by trajectories, phrases, groups, chikaris and
/// assemblages.
///
/// Fresh ids are random v4 UUIDs in 8-4-4-4-12 form. Ids read from a
/// document are kept verbatim, whatever their format.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(String);

impl UniqueId {
    pub fn new_v4() -> Self {
        let mut bytes: [u8; 16] = rand::thread_rng().gen();
        // Version nibble 0100, variant bits 10.
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        let b = &bytes;
        Self(format!(
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3],
            b[4], b[5],
            b[6], b[7],
            b[8], b[9],
            b[10], b[11], b[12], b[13], b[14], b[15],
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UniqueId {
    fn default() -> Self {
        Self::new_v4()
    }
}

impl From<&str> for UniqueId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UniqueId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqueId({})", self.0)
    }
}
