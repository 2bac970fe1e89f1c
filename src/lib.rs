//! `rate-harvest` library crate.
//!
//! The binary (`rates`) is a thin wrapper around this library so that:
//!
//! - extraction and scheduling are testable without network or processes
//! - new institutions are configuration, not code
//!
//! Data flow: `sources` (fetch via `data`, extract via `extract`, normalize via
//! `normalize`) -> `crawl` (channel + join barrier) -> `store`.

pub mod app;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod data;
pub mod domain;
pub mod error;
pub mod extract;
pub mod io;
pub mod normalize;
pub mod report;
pub mod sources;
pub mod store;
