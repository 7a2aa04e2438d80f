//! Glottocode allocation.
//!
//! New codes are issued from a persisted counter store, `glottocodes.json`: a
//! map from 4-character name slugs to the last number handed out for that
//! slug. The store is written with sorted keys and pretty-printed so diffs
//! stay reviewable.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// First issue for a fresh slug is `<slug>1234`.
const SEED: u32 = 1233;

#[derive(Debug, Clone, PartialEq)]
pub enum CodesError {
    Io(String),
    Json(String),
    /// A name with no alphanumeric characters cannot be slugged.
    UnsluggableName(String),
}

impl std::error::Error for CodesError {}

impl fmt::Display for CodesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodesError::Io(msg) => write!(f, "IO error: {}", msg),
            CodesError::Json(msg) => write!(f, "glottocodes store: {}", msg),
            CodesError::UnsluggableName(name) => {
                write!(f, "cannot derive a code slug from {:?}", name)
            }
        }
    }
}

/// Lowercased alphanumeric skeleton of a display name.
pub fn slug(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The persisted allocation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glottocodes(BTreeMap<String, u32>);

impl Glottocodes {
    pub fn load(path: &Path) -> Result<Self, CodesError> {
        let text = fs::read_to_string(path).map_err(|e| CodesError::Io(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| CodesError::Json(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), CodesError> {
        let text =
            serde_json::to_string_pretty(self).map_err(|e| CodesError::Json(e.to_string()))?;
        fs::write(path, text).map_err(|e| CodesError::Io(e.to_string()))
    }

    /// Issue the next code for `name`: the first four slug characters (short
    /// slugs pad by repeating their last character) plus the incremented
    /// counter.
    pub fn new_code(&mut self, name: &str) -> Result<String, CodesError> {
        let mut alpha = slug(name);
        alpha.truncate(4);
        let last = match alpha.chars().last() {
            Some(c) => c,
            None => return Err(CodesError::UnsluggableName(name.to_string())),
        };
        while alpha.len() < 4 {
            alpha.push(last);
        }
        let num = self.0.entry(alpha.clone()).or_insert(SEED);
        *num += 1;
        Ok(format!("{}{}", alpha, num))
    }
}
