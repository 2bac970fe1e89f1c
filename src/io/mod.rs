//! File output.
//!
//! - snapshot CSV export (`export`)

pub mod export;

pub use export::write_snapshot_csv;
