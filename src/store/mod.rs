//! Persistence of observations.
//!
//! Records are keyed by their natural identity ([`InterestKey`]): a second
//! observation of the same key replaces the first, so re-running a crawl
//! refreshes rates and crawl timestamps instead of duplicating rows.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::InterestSet;

pub mod json;
pub mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write store {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store {} is not a valid snapshot: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    /// Same key seen before; rate and crawl time replaced.
    Updated,
}

pub trait Store: Send {
    fn upsert_interest_set(&mut self, set: InterestSet) -> Result<Upsert, StoreError>;

    /// Full snapshot in key order.
    fn interest_sets(&self) -> Vec<InterestSet>;

    /// Make everything upserted so far durable.
    fn flush(&mut self) -> Result<(), StoreError>;
}
