//! Source adapters.
//!
//! One adapter per institution. Every adapter fetches its documents, runs the
//! extraction engines over them and pushes records through an [`Emitter`].
//! Adapters trap their own failures: a broken page means fewer records, never
//! an error returned to the scheduler.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;

use crate::domain::InterestSet;

pub mod config;
pub mod configured;
pub mod convert;

pub use config::{DocumentConfig, FieldMap, RecordRateType, SourceConfig, TableLayout};
pub use configured::{ConfiguredSource, build_sources};

/// Per-run facts shared by every adapter.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    /// Stamped on every record produced by this run.
    pub crawled_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(crawled_at: DateTime<Utc>) -> Self {
        Self { crawled_at }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }
}

/// Write end of the run's record channel, handed to one adapter.
///
/// Sending never blocks (the channel is unbounded). Adapters cannot close the
/// channel; it closes when the scheduler drops the last sender.
pub struct Emitter {
    sender: Sender<InterestSet>,
    emitted: AtomicUsize,
    dropped: AtomicUsize,
}

impl Emitter {
    pub fn new(sender: Sender<InterestSet>) -> Self {
        Self {
            sender,
            emitted: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    pub fn emit(&self, set: InterestSet) {
        match self.sender.send(set) {
            Ok(()) => {
                self.emitted.fetch_add(1, Ordering::Relaxed);
            }
            // Receiver gone; only happens if the consumer died.
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn emit_all(&self, sets: impl IntoIterator<Item = InterestSet>) {
        for set in sets {
            self.emit(set);
        }
    }

    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// An institution's rate publication.
pub trait Source: Send + Sync {
    /// Institution name; also the `bank` of every record emitted.
    fn name(&self) -> &str;

    /// Fetch and extract everything this source publishes.
    fn crawl(&self, ctx: &RunContext, out: &Emitter);
}
