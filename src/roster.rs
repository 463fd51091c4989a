// Contestant roster loading from CSV files.
//
// Expected columns: Name (required) and Bio (optional). Extra columns are
// ignored, so spreadsheets exported with production notes still load.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// One contestant parsed from a roster file, not yet attached to a season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub bio: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

/// Raw roster CSV row. Extra columns are absorbed via `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
#[allow(dead_code, non_snake_case)]
struct RawRosterRow {
    Name: String,
    #[serde(default, alias = "Biography")]
    Bio: String,
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

fn load_roster_from_reader<R: Read>(rdr: R) -> Result<Vec<RosterEntry>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut entries: Vec<RosterEntry> = Vec::new();
    for result in reader.deserialize::<RawRosterRow>() {
        match result {
            Ok(raw) => {
                let name = raw.Name.trim().to_string();
                if name.is_empty() {
                    warn!("skipping roster row with empty name");
                    continue;
                }
                if entries.iter().any(|e| e.name == name) {
                    warn!("skipping duplicate roster entry for '{}'", name);
                    continue;
                }
                let bio = raw.Bio.trim();
                entries.push(RosterEntry {
                    name,
                    bio: if bio.is_empty() {
                        None
                    } else {
                        Some(bio.to_string())
                    },
                });
            }
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
            }
        }
    }
    Ok(entries)
}

/// Load a contestant roster from a CSV file. Malformed rows are skipped with
/// a warning; an empty result is an error since importing nothing is always
/// a mistake.
pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>, RosterError> {
    let display = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| RosterError::Io {
        path: display.clone(),
        source,
    })?;
    let entries = load_roster_from_reader(file).map_err(|source| RosterError::Csv {
        path: display.clone(),
        source,
    })?;
    if entries.is_empty() {
        return Err(RosterError::Validation(format!(
            "no contestants found in {display}"
        )));
    }
    Ok(entries)
}
