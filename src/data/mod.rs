//! Data acquisition.
//!
//! Sources never talk to the network directly; they go through a [`Fetcher`]
//! so tests can substitute canned documents.

pub mod fetch;

pub use fetch::{Fetcher, HttpFetcher, RequestHeaders};
