//! Tolerant delimited-text parsing for equipment telemetry uploads.
//!
//! [`TableParser::parse`] decodes the raw upload, normalizes the header row
//! and returns a lazy [`RowStream`] over the data rows. The stream is
//! single-pass: each row is scanned out of the decoded text on demand and
//! nothing is buffered beyond the current record.
//!
//! Typed conversion (defaults, numeric coercion) lives in [`record`].

pub mod record;

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::codepage;
use crate::error::CoreError;

pub use record::{EquipmentRecord, FieldIssue, Metric, MetricSet};

// ---------------------------------------------------------------------------
// Recognized columns and defaults
// ---------------------------------------------------------------------------

pub const COL_EQUIPMENT_ID: &str = "equipment_id";
pub const COL_EQUIPMENT_NAME: &str = "equipment_name";
pub const COL_TYPE: &str = "type";
pub const COL_FLOWRATE: &str = "flowrate";
pub const COL_PRESSURE: &str = "pressure";
pub const COL_TEMPERATURE: &str = "temperature";

/// Name used when a row has no `equipment_name`.
pub const DEFAULT_NAME: &str = "Unknown";
/// Type used when a row has no `type`.
pub const DEFAULT_TYPE: &str = "Generic";
/// Stored value for a missing or non-numeric measurement.
pub const DEFAULT_NUMERIC: f64 = 0.0;

/// Delimiters considered when sniffing the header row, in tie-break order.
const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Inputs where more than 1 in this many characters is a control character
/// are treated as binary.
const CONTROL_CHAR_RATIO: usize = 20;

/// Normalize a header cell: trim, lowercase, internal spaces to underscores.
///
/// Idempotent: `normalize_header(&normalize_header(s)) == normalize_header(s)`.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Synthesized equipment identifier for a row without one.
pub fn synthesized_equipment_id(row_index: usize) -> String {
    format!("EQ-{row_index}")
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Normalized header row with column lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Header {
    /// Build a header from raw cells. Empty cells become `unnamed_{n}`; a
    /// duplicate column name keeps its first position for lookup.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Self {
        let mut columns = Vec::with_capacity(cells.len());
        let mut positions = HashMap::with_capacity(cells.len());
        for (i, cell) in cells.iter().enumerate() {
            let mut name = normalize_header(cell.as_ref());
            if name.is_empty() {
                name = format!("unnamed_{i}");
            }
            positions.entry(name.clone()).or_insert(i);
            columns.push(name);
        }
        Self { columns, positions }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Which of the numeric measurement columns exist in this header.
    pub fn metrics(&self) -> MetricSet {
        MetricSet::from_fn(|metric| self.contains(metric.column()))
    }
}

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// One decoded data row: a mapping from normalized column name to cell text.
///
/// Cells beyond the header width are kept but have no column name; cells
/// missing at the end of a short row read as absent.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// Zero-based data row index (blank lines do not count).
    pub index: usize,
    /// One-based line number where the record starts.
    pub line: usize,
    header: Arc<Header>,
    cells: Vec<String>,
}

impl RawRow {
    /// Cell text for a column, or `None` when the column is missing from the
    /// header or the row is too short.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .position(column)
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
    }

    /// Iterate `(column, value)` pairs for every named cell present in the row.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .columns()
            .iter()
            .zip(self.cells.iter())
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Entry point for turning upload bytes into rows.
pub struct TableParser;

impl TableParser {
    /// Decode `bytes` and read the header row.
    ///
    /// Fails with [`CoreError::Parse`] when the bytes are not text, or when
    /// there is no non-blank header row. Errors in later records (such as an
    /// unterminated quote) surface while iterating the returned stream.
    pub fn parse(bytes: &[u8]) -> Result<RowStream<'_>, CoreError> {
        let text = decode_text(bytes)?;

        let mut pos = 0;
        let mut line = 1;
        let (header_cells, delimiter) = loop {
            let Some(first_line) = text.get(pos..).filter(|rest| !rest.is_empty()) else {
                return Err(CoreError::Parse("input has no header row".into()));
            };
            let delimiter = sniff_delimiter(first_line);
            let record = scan_record(&text, pos, delimiter, line)?
                .ok_or_else(|| CoreError::Parse("input has no header row".into()))?;
            line += text[pos..record.next].matches('\n').count();
            pos = record.next;
            if !record.is_blank() {
                break (record.cells, delimiter);
            }
        };

        if header_cells.iter().all(|c| c.trim().is_empty()) {
            return Err(CoreError::Parse("header row is empty".into()));
        }

        Ok(RowStream {
            text,
            pos,
            line,
            next_index: 0,
            delimiter,
            header: Arc::new(Header::from_cells(&header_cells)),
            failed: false,
        })
    }
}

/// Lazy, single-pass sequence of data rows.
#[derive(Debug)]
pub struct RowStream<'a> {
    text: Cow<'a, str>,
    pos: usize,
    line: usize,
    next_index: usize,
    delimiter: char,
    header: Arc<Header>,
    failed: bool,
}

impl<'a> RowStream<'a> {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Measurement columns present in the header.
    pub fn metrics(&self) -> MetricSet {
        self.header.metrics()
    }

    /// Convert each raw row into a typed [`EquipmentRecord`] with defaults applied.
    pub fn records(self) -> impl Iterator<Item = Result<EquipmentRecord, CoreError>> + 'a {
        self.map(|row| row.map(|r| EquipmentRecord::from_raw(&r)))
    }
}

impl Iterator for RowStream<'_> {
    type Item = Result<RawRow, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let record = match scan_record(&self.text, self.pos, self.delimiter, self.line) {
                Ok(Some(record)) => record,
                Ok(None) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };
            let start_line = self.line;
            self.line += self.text[self.pos..record.next].matches('\n').count();
            self.pos = record.next;

            if record.is_blank() {
                continue;
            }

            let index = self.next_index;
            self.next_index += 1;
            return Some(Ok(RawRow {
                index,
                line: start_line,
                header: Arc::clone(&self.header),
                cells: record.cells,
            }));
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding and scanning helpers
// ---------------------------------------------------------------------------

/// Decode upload bytes as UTF-8, falling back to Windows-1252 for legacy
/// spreadsheet exports.
fn decode_text(bytes: &[u8]) -> Result<Cow<'_, str>, CoreError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if bytes.contains(&0) {
        return Err(CoreError::Parse(
            "input contains NUL bytes and is not delimited text".into(),
        ));
    }

    let text = match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(codepage::decode(bytes)),
    };

    let mut total = 0usize;
    let mut control = 0usize;
    for ch in text.chars() {
        total += 1;
        if ch.is_control() && !matches!(ch, '\n' | '\r' | '\t') {
            control += 1;
        }
    }
    if control > 0 && control * CONTROL_CHAR_RATIO > total {
        return Err(CoreError::Parse(
            "input looks like binary data, not delimited text".into(),
        ));
    }

    Ok(text)
}

/// Pick the candidate delimiter that occurs most often on the first line,
/// ignoring quoted sections. Defaults to a comma.
fn sniff_delimiter(text: &str) -> char {
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for ch in text.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\n' | '\r' if !in_quotes => break,
            _ if !in_quotes => {
                if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|&d| d == ch) {
                    counts[i] += 1;
                }
            }
            _ => {}
        }
    }

    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    CANDIDATE_DELIMITERS[best]
}

/// A single scanned record and the byte offset where the next one starts.
#[derive(Debug)]
struct ScannedRecord {
    cells: Vec<String>,
    next: usize,
}

impl ScannedRecord {
    fn is_blank(&self) -> bool {
        self.cells.len() == 1 && self.cells[0].trim().is_empty()
    }
}

/// Scan one record starting at byte offset `start`, handling quoted fields
/// (with `""` escapes and embedded newlines). Returns `None` at end of input.
fn scan_record(
    text: &str,
    start: usize,
    delimiter: char,
    line: usize,
) -> Result<Option<ScannedRecord>, CoreError> {
    if start >= text.len() {
        return Ok(None);
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text[start..].char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if matches!(chars.peek(), Some((_, '"'))) {
                    // Escaped quote.
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }

        match ch {
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            c if c == delimiter => {
                cells.push(std::mem::take(&mut current));
                at_field_start = true;
            }
            '\n' => {
                cells.push(current);
                return Ok(Some(ScannedRecord {
                    cells,
                    next: start + offset + 1,
                }));
            }
            '\r' => {
                let mut next = start + offset + 1;
                if matches!(chars.peek(), Some((_, '\n'))) {
                    next += 1;
                }
                cells.push(current);
                return Ok(Some(ScannedRecord { cells, next }));
            }
            _ => {
                current.push(ch);
                at_field_start = false;
            }
        }
    }

    if in_quotes {
        return Err(CoreError::Parse(format!(
            "unterminated quoted field in record starting on line {line}"
        )));
    }

    cells.push(current);
    Ok(Some(ScannedRecord {
        cells,
        next: text.len(),
    }))
}

// ===========================================================================
// Tests
// ===========================================================================
