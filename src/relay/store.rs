use crate::relay::*;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// The durable set of fingerprints of every row ever ingested, whatever its
/// validation or submission outcome turned out to be.
///
/// The set only ever grows. A fingerprint present here means "do not
/// reprocess this exact row again". Persistence is whole-file
/// read-modify-write: the single pipeline process is the only writer.
pub struct SeenSet {
    path: PathBuf,
    seen: HashSet<String>,
}

impl SeenSet {
    /// Loads the persisted set, or starts empty when the file does not exist
    /// yet.
    pub fn load(path: impl AsRef<Path>) -> RelayResult<SeenSet> {
        let path = path.as_ref().to_path_buf();
        let seen = if path.exists() {
            let contents = fs::read_to_string(&path).context(OpeningJsonSnafu {
                path: path.display().to_string(),
            })?;
            let fingerprints: Vec<String> =
                serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
            fingerprints.into_iter().collect()
        } else {
            HashSet::new()
        };
        debug!("loaded {} fingerprints from {:?}", seen.len(), path);
        Ok(SeenSet { path, seen })
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Returns true when the fingerprint had not been seen before.
    pub fn insert(&mut self, fingerprint: String) -> bool {
        self.seen.insert(fingerprint)
    }

    /// Writes the complete set back, sorted for a stable file layout.
    pub fn save(&self) -> RelayResult<()> {
        let mut fingerprints: Vec<&String> = self.seen.iter().collect();
        fingerprints.sort();
        let contents =
            serde_json::to_string_pretty(&fingerprints).context(SerializingJsonSnafu {})?;
        fs::write(&self.path, contents).context(WritingJsonSnafu {
            path: self.path.display().to_string(),
        })
    }
}

/// An append-only JSON ledger: a persisted sequence of entries that prior
/// runs wrote and that this run only ever extends.
pub struct JsonLedger<T> {
    path: PathBuf,
    _entry: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> JsonLedger<T> {
    pub fn new(path: impl AsRef<Path>) -> JsonLedger<T> {
        JsonLedger {
            path: path.as_ref().to_path_buf(),
            _entry: PhantomData,
        }
    }

    /// All entries persisted so far, oldest first. Empty when the file does
    /// not exist yet.
    pub fn entries(&self) -> RelayResult<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).context(OpeningJsonSnafu {
            path: self.path.display().to_string(),
        })?;
        serde_json::from_str(&contents).context(ParsingJsonSnafu {})
    }

    /// Appends one entry: load the whole sequence, push, write it back.
    pub fn append(&self, entry: T) -> RelayResult<()> {
        let mut entries = self.entries()?;
        entries.push(entry);
        let contents = serde_json::to_string_pretty(&entries).context(SerializingJsonSnafu {})?;
        fs::write(&self.path, contents).context(WritingJsonSnafu {
            path: self.path.display().to_string(),
        })
    }
}

/// One rejected or failed record, kept for follow-up.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FailedEntry {
    pub id: String,
    pub reason: String,
}
