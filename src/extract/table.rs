//! Anchor-located HTML tables.
//!
//! Publishers put several tables on a page and rarely give them stable ids, so
//! a table is found through nearby text: either the first table after a text
//! node containing the anchor phrase, or the table whose `<caption>` contains
//! it. Parsing keeps cells verbatim (whitespace-normalized); interpreting them
//! is up to the caller.

use scraper::{ElementRef, Html, Node};
use serde::Deserialize;
use tracing::debug;

use super::normalize_ws;
use crate::error::ExtractError;

/// How the anchor phrase relates to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    /// The first `<table>` after a text node containing the phrase.
    #[default]
    Text,
    /// The `<table>` whose `<caption>` contains the phrase.
    Caption,
}

/// Header row plus data rows, in document order.
///
/// Rows are not padded: callers must check a row's length before indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A column given either by zero-based position or by header text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Header(String),
}

impl ParsedTable {
    /// Resolve a column reference against the header.
    ///
    /// Header names match case-insensitively, exact match first, then substring.
    pub fn column(&self, column: &ColumnRef) -> Option<usize> {
        match column {
            ColumnRef::Index(idx) => (*idx < self.header.len()).then_some(*idx),
            ColumnRef::Header(name) => {
                let wanted = normalize_header_name(name);
                let names: Vec<String> = self.header.iter().map(|h| normalize_header_name(h)).collect();
                names
                    .iter()
                    .position(|h| *h == wanted)
                    .or_else(|| names.iter().position(|h| h.contains(&wanted)))
            }
        }
    }
}

fn normalize_header_name(name: &str) -> String {
    normalize_ws(name.trim_start_matches('\u{feff}')).to_lowercase()
}

/// Find the table for `anchor` in an already parsed document.
pub fn locate_table<'a>(document: &'a Html, anchor: &str, mode: AnchorMode) -> Result<ElementRef<'a>, ExtractError> {
    let anchor = normalize_ws(anchor);
    match mode {
        AnchorMode::Text => locate_after_text(document, &anchor),
        AnchorMode::Caption => locate_by_caption(document, &anchor),
    }
}

fn locate_after_text<'a>(document: &'a Html, anchor: &str) -> Result<ElementRef<'a>, ExtractError> {
    let mut seen_anchor = false;
    for node in document.tree.root().descendants() {
        match node.value() {
            Node::Text(text) if !seen_anchor => {
                let in_script = node
                    .parent()
                    .and_then(|parent| parent.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
                    .unwrap_or(false);
                if !in_script && normalize_ws(text).contains(anchor) {
                    seen_anchor = true;
                }
            }
            Node::Element(element) if seen_anchor && element.name() == "table" => {
                if let Some(table) = ElementRef::wrap(node) {
                    return Ok(table);
                }
            }
            _ => {}
        }
    }

    if seen_anchor {
        Err(ExtractError::not_found(format!("table after anchor '{anchor}'")))
    } else {
        Err(ExtractError::not_found(format!("anchor '{anchor}'")))
    }
}

fn locate_by_caption<'a>(document: &'a Html, anchor: &str) -> Result<ElementRef<'a>, ExtractError> {
    for node in document.tree.root().descendants() {
        let Some(table) = ElementRef::wrap(node) else { continue };
        if table.value().name() != "table" {
            continue;
        }
        let caption = table
            .children()
            .filter_map(ElementRef::wrap)
            .find(|child| child.value().name() == "caption");
        if let Some(caption) = caption {
            if normalize_ws(&caption.text().collect::<String>()).contains(anchor) {
                return Ok(table);
            }
        }
    }
    Err(ExtractError::not_found(format!("table with caption '{anchor}'")))
}

/// Split a located table into header and rows.
///
/// Rows of nested tables are not part of this table.
pub fn parse_table(table: ElementRef<'_>) -> Result<ParsedTable, ExtractError> {
    let mut rows: Vec<Vec<String>> = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr" && belongs_to(*el, table))
        .map(|tr| {
            tr.children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                .map(|cell| normalize_ws(&cell.text().collect::<String>()))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    if rows.is_empty() {
        return Err(ExtractError::shape("table has no rows"));
    }
    let header = rows.remove(0);
    Ok(ParsedTable { header, rows })
}

/// True when the nearest enclosing `<table>` of `row` is `table` itself.
fn belongs_to(row: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    row.ancestors()
        .find(|node| node.value().as_element().is_some_and(|e| e.name() == "table"))
        .is_some_and(|node| node.id() == table.id())
}

/// Parse `html`, locate the table for `anchor`, and split it into rows.
pub fn extract_table(html: &str, anchor: &str, mode: AnchorMode) -> Result<ParsedTable, ExtractError> {
    let document = Html::parse_document(html);
    let table = locate_table(&document, anchor, mode)?;
    parse_table(table)
}

/// Repair rows that a publisher split in two (a label-only row followed by a
/// values-only row).
///
/// A single-cell row whose cell `is_label` absorbs the next row; a single-cell
/// row that is not a label is dropped. Rows with more than one cell pass
/// through, which makes the pass idempotent.
pub fn sanitize_split_rows<F>(rows: Vec<Vec<String>>, is_label: F) -> Vec<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let mut out = Vec::with_capacity(rows.len());
    let mut iter = rows.into_iter();
    while let Some(row) = iter.next() {
        if row.len() != 1 {
            out.push(row);
            continue;
        }
        if !is_label(&row[0]) {
            debug!(cell = %row[0], "dropping lone non-label row");
            continue;
        }
        match iter.next() {
            Some(values) => {
                let mut merged = row;
                merged.extend(values);
                out.push(merged);
            }
            None => debug!(cell = %row[0], "dropping trailing label row without values"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <script>var t = "Aktuella räntor:";</script>
          <table><tr><td>decoy</td></tr></table>
          <h2>Aktuella räntor:</h2>
          <p>Gäller från idag</p>
          <table>
            <thead><tr><th>Bindningstid</th><th>Ränta</th></tr></thead>
            <tbody>
              <tr><td>3 mån</td><td>3,33&nbsp;%</td></tr>
              <tr><td>1 år</td><td>3,44 %</td></tr>
            </tbody>
          </table>
          <table><caption>Snitträntor  september</caption>
            <tr><th>Månad</th><th>3 mån</th></tr>
            <tr><td>2025-09</td><td>2,90</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn first_table_after_anchor_text() {
        let table = extract_table(PAGE, "Aktuella räntor:", AnchorMode::Text).unwrap();
        assert_eq!(table.header, vec!["Bindningstid", "Ränta"]);
        assert_eq!(
            table.rows,
            vec![vec!["3 mån".to_string(), "3,33 %".to_string()], vec!["1 år".to_string(), "3,44 %".to_string()]]
        );
    }

    #[test]
    fn table_by_caption() {
        let table = extract_table(PAGE, "Snitträntor september", AnchorMode::Caption).unwrap();
        assert_eq!(table.header, vec!["Månad", "3 mån"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn missing_anchor_is_not_found() {
        let err = extract_table(PAGE, "Listräntor", AnchorMode::Text).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
        let err = extract_table(PAGE, "Listräntor", AnchorMode::Caption).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn anchor_without_following_table_is_not_found() {
        let html = "<table><tr><td>x</td></tr></table><p>Aktuella räntor</p>";
        let err = extract_table(html, "Aktuella räntor", AnchorMode::Text).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(msg) if msg.contains("table after")));
    }

    #[test]
    fn nested_table_rows_are_excluded() {
        let html = r#"<p>Räntor</p><table>
            <tr><th>Term</th><th>Ränta</th></tr>
            <tr><td>1 år</td><td><table><tr><td>inner</td></tr></table>3,1</td></tr>
        </table>"#;
        let table = extract_table(html, "Räntor", AnchorMode::Text).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], "1 år");
    }

    #[test]
    fn short_rows_are_not_padded() {
        let html = "<p>R</p><table><tr><th>a</th><th>b</th></tr><tr><td>only</td></tr></table>";
        let table = extract_table(html, "R", AnchorMode::Text).unwrap();
        assert_eq!(table.rows, vec![vec!["only".to_string()]]);
    }

    #[test]
    fn column_lookup_by_index_and_header() {
        let table = ParsedTable {
            header: vec!["Bindningstid".into(), "Listränta (%)".into()],
            rows: vec![],
        };
        assert_eq!(table.column(&ColumnRef::Index(1)), Some(1));
        assert_eq!(table.column(&ColumnRef::Index(2)), None);
        assert_eq!(table.column(&ColumnRef::Header("bindningstid".into())), Some(0));
        assert_eq!(table.column(&ColumnRef::Header("listränta".into())), Some(1));
        assert_eq!(table.column(&ColumnRef::Header("snitt".into())), None);
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn is_month(s: &str) -> bool {
        s.starts_with("2025-")
    }

    #[test]
    fn split_rows_are_merged_and_junk_dropped() {
        let rows = vec![
            row(&["2025-09"]),
            row(&["2,90", "3,10"]),
            row(&["Fotnot"]),
            row(&["2025-08", "2,95", "3,15"]),
            row(&["2025-07"]),
        ];
        let clean = sanitize_split_rows(rows, is_month);
        assert_eq!(clean, vec![row(&["2025-09", "2,90", "3,10"]), row(&["2025-08", "2,95", "3,15"])]);
    }

    #[test]
    fn sanitizer_is_idempotent() {
        let rows = vec![row(&["2025-09"]), row(&["2,90", "3,10"]), row(&["2025-08", "2,95", "3,15"])];
        let once = sanitize_split_rows(rows, is_month);
        let twice = sanitize_split_rows(once.clone(), is_month);
        assert_eq!(once, twice);
    }
}
