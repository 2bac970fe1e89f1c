//! The crawl scheduler.
//!
//! Every source runs as its own task on a dedicated rayon pool, producing into
//! one unbounded channel. A consumer thread drains the channel into the store
//! while the sources are still running. The channel closes only after the
//! pool scope has joined every source task.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, unbounded};
use tracing::{error, info, info_span, warn};

use crate::domain::InterestSet;
use crate::error::AppError;
use crate::report::{SummaryRow, summarize};
use crate::sources::{Emitter, RunContext, Source};
use crate::store::{Store, Upsert};

/// How one source task ended.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub name: String,
    pub emitted: usize,
    pub elapsed: Duration,
    /// Panic message, if the source panicked.
    pub panicked: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub sources: Vec<SourceOutcome>,
    pub inserted: usize,
    pub updated: usize,
    pub upsert_failures: usize,
    /// Per-(bank, type) summary of the full store snapshot after the run.
    pub summary: Vec<SummaryRow>,
}

impl RunReport {
    pub fn panicked(&self) -> usize {
        self.sources.iter().filter(|s| s.panicked.is_some()).count()
    }
}

#[derive(Debug, Default)]
struct DrainStats {
    inserted: usize,
    updated: usize,
    failures: usize,
}

fn drain(rx: Receiver<InterestSet>, store: &mut dyn Store) -> DrainStats {
    let mut stats = DrainStats::default();
    for set in rx {
        let key = set.key();
        match store.upsert_interest_set(set) {
            Ok(Upsert::Inserted) => stats.inserted += 1,
            Ok(Upsert::Updated) => stats.updated += 1,
            Err(err) => {
                error!(bank = %key.bank, kind = %key.kind, term = %key.term, error = %err, "upsert failed");
                stats.failures += 1;
            }
        }
    }
    stats
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn run_one(source: &dyn Source, ctx: &RunContext, emitter: &Emitter) -> SourceOutcome {
    let span = info_span!("source", bank = source.name());
    let _guard = span.enter();
    let started = Instant::now();

    let result = catch_unwind(AssertUnwindSafe(|| source.crawl(ctx, emitter)));
    let elapsed = started.elapsed();
    let panicked = result.err().map(|payload| panic_message(payload.as_ref()));

    match &panicked {
        Some(msg) => error!(panic = %msg, emitted = emitter.emitted(), "source panicked"),
        None => info!(records = emitter.emitted(), elapsed_ms = elapsed.as_millis() as u64, "source finished"),
    }
    if emitter.dropped() > 0 {
        warn!(dropped = emitter.dropped(), "records dropped after the consumer stopped");
    }

    SourceOutcome {
        name: source.name().to_string(),
        emitted: emitter.emitted(),
        elapsed,
        panicked,
    }
}

/// Run every source to completion, streaming their records into `store`.
///
/// Source failures (including panics) never fail the run; only the pool, the
/// consumer thread and the final flush can.
pub fn run_sources(
    sources: &[Box<dyn Source>],
    store: &mut dyn Store,
    ctx: &RunContext,
) -> Result<RunReport, AppError> {
    info!(sources = sources.len(), crawled_at = %ctx.crawled_at, "crawl started");

    let mut outcomes: Vec<Option<SourceOutcome>> = vec![None; sources.len()];
    let (tx, rx) = unbounded::<InterestSet>();

    // One thread per source so a slow fetch never delays a sibling.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(sources.len().max(1))
        .thread_name(|i| format!("source-{i}"))
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to start source pool: {e}")))?;

    let stats = thread::scope(|scope| {
        let consumer = thread::Builder::new()
            .name("store-consumer".to_string())
            .spawn_scoped(scope, || drain(rx, store))
            .map_err(|e| AppError::new(4, format!("Failed to start consumer thread: {e}")))?;

        pool.scope(|s| {
            for (source, slot) in sources.iter().zip(outcomes.iter_mut()) {
                let emitter = Emitter::new(tx.clone());
                s.spawn(move |_| {
                    *slot = Some(run_one(source.as_ref(), ctx, &emitter));
                });
            }
        });
        // Every source task has joined; this is the last sender.
        drop(tx);

        consumer
            .join()
            .map_err(|_| AppError::new(4, "Store consumer thread panicked."))
    })?;

    store
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush store: {e}")))?;

    let snapshot = store.interest_sets();
    let summary = summarize(&snapshot);
    for row in &summary {
        info!(bank = %row.bank, kind = %row.kind, count = row.count, "snapshot");
    }

    let report = RunReport {
        sources: outcomes.into_iter().flatten().collect(),
        inserted: stats.inserted,
        updated: stats.updated,
        upsert_failures: stats.failures,
        summary,
    };
    info!(
        inserted = report.inserted,
        updated = report.updated,
        failed = report.upsert_failures,
        panicked = report.panicked(),
        "crawl finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossbeam_channel::Sender;

    use super::*;
    use crate::domain::{InterestType, Term};
    use crate::sources::configured::tests::{FakeFetcher, RATES_PAGE, rates_page_config};
    use crate::sources::build_sources;
    use crate::store::{MemoryStore, StoreError};

    struct Fixed {
        name: &'static str,
        rates: Vec<(Term, f32)>,
    }

    impl Source for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn crawl(&self, ctx: &RunContext, out: &Emitter) {
            for (term, rate) in &self.rates {
                out.emit(InterestSet::list_rate(self.name, *term, *rate, None, ctx.crawled_at).unwrap());
            }
        }
    }

    /// Fails internally and, like every source, swallows the failure.
    struct Broken;

    impl Source for Broken {
        fn name(&self) -> &str {
            "Broken"
        }

        fn crawl(&self, _ctx: &RunContext, _out: &Emitter) {}
    }

    struct Panicking;

    impl Source for Panicking {
        fn name(&self) -> &str {
            "Panicking"
        }

        fn crawl(&self, ctx: &RunContext, out: &Emitter) {
            out.emit(InterestSet::list_rate("Panicking", Term::OneYear, 3.0, None, ctx.crawled_at).unwrap());
            panic!("layout changed");
        }
    }

    #[test]
    fn failing_source_does_not_affect_siblings() {
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(Broken),
            Box::new(Fixed {
                name: "B",
                rates: vec![(Term::ThreeMonths, 3.1), (Term::OneYear, 3.2)],
            }),
        ];
        let mut store = MemoryStore::new();
        let report = run_sources(&sources, &mut store, &RunContext::now()).unwrap();

        let banks: Vec<String> = store.interest_sets().iter().map(|s| s.bank().to_string()).collect();
        assert_eq!(banks, vec!["B", "B"]);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.sources[0].emitted, 0);
        assert_eq!(report.sources[1].emitted, 2);
    }

    #[test]
    fn panicking_source_is_contained() {
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(Panicking),
            Box::new(Fixed {
                name: "B",
                rates: vec![(Term::FiveYears, 3.9)],
            }),
        ];
        let mut store = MemoryStore::new();
        let report = run_sources(&sources, &mut store, &RunContext::now()).unwrap();

        assert_eq!(report.panicked(), 1);
        assert_eq!(report.sources[0].panicked.as_deref(), Some("layout changed"));
        // Records emitted before the panic were already streamed to the store.
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn empty_source_list_finishes() {
        let mut store = MemoryStore::new();
        let report = run_sources(&[], &mut store, &RunContext::now()).unwrap();
        assert!(report.sources.is_empty());
        assert!(report.summary.is_empty());
    }

    #[test]
    fn repeated_runs_update_instead_of_duplicating() {
        let sources: Vec<Box<dyn Source>> = vec![Box::new(Fixed {
            name: "B",
            rates: vec![(Term::OneYear, 3.2)],
        })];
        let mut store = MemoryStore::new();
        run_sources(&sources, &mut store, &RunContext::now()).unwrap();
        let report = run_sources(&sources, &mut store, &RunContext::now()).unwrap();
        assert_eq!((report.inserted, report.updated), (0, 1));
        assert_eq!(store.len(), 1);
    }

    struct RejectingStore;

    impl Store for RejectingStore {
        fn upsert_interest_set(&mut self, _set: InterestSet) -> Result<Upsert, StoreError> {
            Err(StoreError::Write {
                path: "rates.json".into(),
                source: std::io::Error::other("disk full"),
            })
        }

        fn interest_sets(&self) -> Vec<InterestSet> {
            Vec::new()
        }

        fn flush(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn upsert_failures_are_counted_not_fatal() {
        let sources: Vec<Box<dyn Source>> = vec![Box::new(Fixed {
            name: "B",
            rates: vec![(Term::OneYear, 3.2), (Term::TwoYears, 3.3)],
        })];
        let report = run_sources(&sources, &mut RejectingStore, &RunContext::now()).unwrap();
        assert_eq!(report.upsert_failures, 2);
        assert_eq!(report.inserted, 0);
    }

    /// Reports each stored bank on a side channel.
    struct Recording {
        inner: MemoryStore,
        stored: Sender<String>,
    }

    impl Store for Recording {
        fn upsert_interest_set(&mut self, set: InterestSet) -> Result<Upsert, StoreError> {
            let bank = set.bank().to_string();
            let outcome = self.inner.upsert_interest_set(set)?;
            let _ = self.stored.send(bank);
            Ok(outcome)
        }

        fn interest_sets(&self) -> Vec<InterestSet> {
            self.inner.interest_sets()
        }

        fn flush(&mut self) -> Result<(), StoreError> {
            self.inner.flush()
        }
    }

    /// Emits only once the store has seen a record from `after`.
    struct Waiting {
        after: &'static str,
        stored: Receiver<String>,
    }

    impl Source for Waiting {
        fn name(&self) -> &str {
            "Waiting"
        }

        fn crawl(&self, ctx: &RunContext, out: &Emitter) {
            let deadline = Instant::now() + Duration::from_secs(5);
            while let Ok(bank) = self.stored.recv_deadline(deadline) {
                if bank == self.after {
                    out.emit(InterestSet::list_rate("Waiting", Term::OneYear, 3.5, None, ctx.crawled_at).unwrap());
                    return;
                }
            }
        }
    }

    #[test]
    fn records_reach_the_store_while_sources_still_run() {
        let (stored_tx, stored_rx) = unbounded();
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(Fixed {
                name: "A",
                rates: vec![(Term::ThreeMonths, 3.1)],
            }),
            Box::new(Waiting {
                after: "A",
                stored: stored_rx,
            }),
        ];
        let mut store = Recording {
            inner: MemoryStore::new(),
            stored: stored_tx,
        };
        let report = run_sources(&sources, &mut store, &RunContext::now()).unwrap();

        // Waiting only emits after A's record was upserted mid-run.
        assert_eq!(report.sources[1].emitted, 1);
        let banks: Vec<String> = store.interest_sets().iter().map(|s| s.bank().to_string()).collect();
        assert_eq!(banks, vec!["A", "Waiting"]);
    }

    #[test]
    fn configured_sources_end_to_end() {
        let fetcher = Arc::new(FakeFetcher::default().with("https://example.com/rantor", RATES_PAGE));
        let sources = build_sources(
            vec![
                rates_page_config("Exempelbanken", "https://example.com/rantor"),
                rates_page_config("Nere", "https://example.com/down"),
            ],
            fetcher,
        );
        let mut store = MemoryStore::new();
        let report = run_sources(&sources, &mut store, &RunContext::now()).unwrap();

        let got: Vec<(String, InterestType, Term, f32)> = store
            .interest_sets()
            .iter()
            .map(|s| (s.bank().to_string(), s.kind(), s.term(), s.nominal_rate()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Exempelbanken".to_string(), InterestType::ListRate, Term::ThreeMonths, 3.33),
                ("Exempelbanken".to_string(), InterestType::ListRate, Term::OneYear, 3.44),
            ]
        );
        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.sources[1].emitted, 0);
    }
}
