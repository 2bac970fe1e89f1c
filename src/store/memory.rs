use std::collections::BTreeMap;

use super::{Store, StoreError, Upsert};
use crate::domain::{InterestKey, InterestSet};

/// In-process store ordered by natural key.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    sets: BTreeMap<InterestKey, InterestSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub(crate) fn insert(&mut self, set: InterestSet) -> Upsert {
        match self.sets.insert(set.key(), set) {
            Some(_) => Upsert::Updated,
            None => Upsert::Inserted,
        }
    }
}

impl FromIterator<InterestSet> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = InterestSet>>(iter: I) -> Self {
        let mut store = Self::new();
        for set in iter {
            store.insert(set);
        }
        store
    }
}

impl Store for MemoryStore {
    fn upsert_interest_set(&mut self, set: InterestSet) -> Result<Upsert, StoreError> {
        Ok(self.insert(set))
    }

    fn interest_sets(&self) -> Vec<InterestSet> {
        self.sets.values().cloned().collect()
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
