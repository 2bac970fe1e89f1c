use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{MemoryStore, Store, StoreError, Upsert};
use crate::domain::InterestSet;

/// A [`MemoryStore`] backed by a JSON snapshot file (an array of records in
/// the camelCase wire shape).
///
/// The file is read on open and rewritten as a whole on `flush`.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    inner: MemoryStore,
    dirty: bool,
}

impl JsonStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            let sets: Vec<InterestSet> = serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), records = sets.len(), "store loaded");
            sets.into_iter().collect()
        } else {
            MemoryStore::new()
        };
        Ok(Self {
            path,
            inner,
            dirty: false,
        })
    }
}

impl Store for JsonStore {
    fn upsert_interest_set(&mut self, set: InterestSet) -> Result<Upsert, StoreError> {
        self.dirty = true;
        self.inner.upsert_interest_set(set)
    }

    fn interest_sets(&self) -> Vec<InterestSet> {
        self.inner.interest_sets()
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.inner.interest_sets())?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        // Write next to the target and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        info!(path = %self.path.display(), records = self.inner.len(), "store written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::{RatioBoundaries, Term};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-10-15T06:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rates.json");

        let mut store = JsonStore::open(&path).unwrap();
        store
            .upsert_interest_set(InterestSet::list_rate("Bank", Term::ThreeMonths, 3.33, None, now()).unwrap())
            .unwrap();
        let bracket = RatioBoundaries::new(0.0, 0.6).unwrap();
        store
            .upsert_interest_set(
                InterestSet::ratio_discounted_rate("Bank", Term::OneYear, 3.1, bracket, now()).unwrap(),
            )
            .unwrap();
        store.flush().unwrap();

        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.interest_sets(), store.interest_sets());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"nominalRate\""));
        assert!(text.contains("\"ratioDiscountBoundaries\""));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(JsonStore::open(&path), Err(StoreError::Corrupt { .. })));
    }
}
