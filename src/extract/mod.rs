//! Extraction engines.
//!
//! - HTML tables located by anchor text (`table`)
//! - embedded JSON blobs and nested-path navigation (`payload`)
//! - flat index-reference state arrays (`indexed`)
//! - PDF text streams (`pdf`)
//!
//! Engines never fetch anything; they work on a document already in memory.

pub mod indexed;
pub mod payload;
pub mod pdf;
pub mod table;

pub use indexed::IndexedPayload;
pub use payload::{BlobAnchor, JsonPath, PathStep, extract_blob, navigate, resolve_records};
pub use pdf::{PdfRateKind, extract_text, parse_rates};
pub use table::{AnchorMode, ColumnRef, ParsedTable, extract_table, locate_table, parse_table, sanitize_split_rows};

/// Collapse runs of whitespace (including non-breaking spaces) into one space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}
