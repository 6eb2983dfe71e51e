//! Encrypted template vault
//!
//! One symmetric key and one encrypted template per modality. Keys live in
//! the keys directory, templates in a per-modality directory; both are
//! written with owner-only permissions where the platform supports it.

pub mod codec;
pub mod envelope;
pub mod keys;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use codec::{ElementType, NumericArray, Template};
pub use envelope::EncryptedEnvelope;
pub use keys::{KeyManager, SymmetricKey, KEY_LEN};
pub use store::{load, load_to_file, store};

/// Biometric modality; each owns exactly one key/template slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Face,
    Voice,
}

impl Modality {
    pub const ALL: [Modality; 2] = [Modality::Face, Modality::Voice];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Face => "face",
            Modality::Voice => "voice",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "face" => Ok(Modality::Face),
            "voice" => Ok(Modality::Voice),
            other => Err(format!("Unknown modality: {}", other)),
        }
    }
}
