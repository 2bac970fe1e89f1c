//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the canonical observation (`InterestSet`) and its type-gated detail
//! - the fixed term enumeration (`Term`)
//! - calendar months (`AvgMonth`) and LTV brackets (`RatioBoundaries`)

pub mod types;

pub use types::*;
