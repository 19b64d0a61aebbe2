//! Workbook, sheet, and row data structures.
//!
//! This module defines the in-memory table model the differ works on:
//! - [`Workbook`]: a source label plus sheets keyed by name
//! - [`Sheet`]: a named, ordered sequence of rows
//! - [`Row`]: an ordered sequence of [`CellValue`]s with its 1-based row number

use crate::hashing::normalize_float_for_hash;
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Separator used when building a row's content key. Spreadsheet cells do not
/// carry the ASCII unit separator in practice.
pub const CONTENT_KEY_DELIMITER: char = '\u{1f}';

/// A typed scalar read from one spreadsheet position.
///
/// Equality is per variant with no coercion: `Number(5.0) != Text("5")`, and
/// `Absent` differs from `Text("")`. Date-formatted numbers are read as
/// `DateTime` (or `Time` for a bare time of day), so a `DateTime` never equals
/// the `Number` holding the same serial.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Absent,
}

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    /// The textual form, or `None` for an absent cell.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Absent => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
            CellValue::DateTime(dt) => {
                write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))?;
                write_fraction(f, dt.nanosecond())
            }
            CellValue::Time(t) => {
                write!(f, "{}", t.format("%H:%M:%S"))?;
                write_fraction(f, t.nanosecond())
            }
            CellValue::Absent => Ok(()),
        }
    }
}

/// Sub-second part as six digits, omitted when zero.
fn write_fraction(f: &mut fmt::Formatter<'_>, nanos: u32) -> fmt::Result {
    match nanos / 1_000 {
        0 => Ok(()),
        micros => write!(f, ".{micros:06}"),
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => {
                normalize_float_for_hash(*a) == normalize_float_for_hash(*b)
            }
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a == b,
            (CellValue::Time(a), CellValue::Time(b)) => a == b,
            (CellValue::Absent, CellValue::Absent) => true,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            CellValue::Text(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            CellValue::Number(n) => {
                1u8.hash(state);
                normalize_float_for_hash(*n).hash(state);
            }
            CellValue::Bool(b) => {
                2u8.hash(state);
                b.hash(state);
            }
            CellValue::Absent => 3u8.hash(state),
            CellValue::DateTime(dt) => {
                4u8.hash(state);
                dt.hash(state);
            }
            CellValue::Time(t) => {
                5u8.hash(state);
                t.hash(state);
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl From<NaiveTime> for CellValue {
    fn from(t: NaiveTime) -> Self {
        CellValue::Time(t)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Absent, Into::into)
    }
}

/// One row of a sheet together with its 1-based position in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub number: u32,
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(number: u32, cells: Vec<CellValue>) -> Row {
        Row { number, cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value at `col`, reading past the end of the row as [`CellValue::Absent`].
    pub fn cell(&self, col: usize) -> &CellValue {
        self.cells.get(col).unwrap_or(&CellValue::Absent)
    }

    /// Textual forms of all cells joined by `sep`.
    pub fn joined(&self, sep: &str) -> String {
        let mut out = String::new();
        for (idx, cell) in self.cells.iter().enumerate() {
            if idx > 0 {
                out.push_str(sep);
            }
            out.push_str(&cell.to_string());
        }
        out
    }

    /// Deterministic key used for exact row matching.
    pub fn content_key(&self) -> String {
        let mut buf = [0u8; 4];
        self.joined(CONTENT_KEY_DELIMITER.encode_utf8(&mut buf))
    }
}

/// A named sheet: an ordered sequence of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Sheet {
        Sheet {
            name: name.into(),
            rows,
        }
    }

    /// Build a sheet from raw cell rows, numbering them from 1.
    pub fn from_cells(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Sheet {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| Row::new(idx as u32 + 1, cells))
            .collect();
        Sheet::new(name, rows)
    }

    /// Width of the widest row.
    pub fn max_columns(&self) -> usize {
        self.rows.iter().map(Row::len).max().unwrap_or(0)
    }
}

/// A parsed workbook: a source label and its sheets keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workbook {
    /// File path or `"path (revision)"` label used in diff headers.
    pub source: String,
    pub sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    pub fn new(source: impl Into<String>) -> Workbook {
        Workbook {
            source: source.into(),
            sheets: BTreeMap::new(),
        }
    }

    /// Insert a sheet, replacing any sheet with the same name.
    pub fn insert_sheet(&mut self, sheet: Sheet) -> Option<Sheet> {
        self.sheets.insert(sheet.name.clone(), sheet)
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Workbook {
        self.insert_sheet(sheet);
        self
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_does_not_coerce_between_variants() {
        assert_ne!(CellValue::Number(5.0), CellValue::Text("5".into()));
        assert_ne!(CellValue::Bool(true), CellValue::Text("TRUE".into()));
        assert_ne!(CellValue::Absent, CellValue::Text(String::new()));
        assert_eq!(CellValue::Absent, CellValue::Absent);
        assert_eq!(CellValue::Number(0.0), CellValue::Number(-0.0));
    }

    #[test]
    fn textual_forms() {
        assert_eq!(CellValue::Number(5.0).to_string(), "5");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Bool(false).to_string(), "FALSE");
        assert_eq!(CellValue::Absent.as_text(), None);
        assert_eq!(CellValue::Text(String::new()).as_text(), Some(String::new()));
    }

    #[test]
    fn date_and_time_forms() {
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        let midnight = day.and_hms_opt(0, 0, 0).expect("datetime");
        assert_eq!(CellValue::DateTime(midnight).to_string(), "2024-01-01 00:00:00");

        let precise = day.and_hms_milli_opt(13, 5, 9, 250).expect("datetime");
        assert_eq!(CellValue::from(precise).to_string(), "2024-01-01 13:05:09.250000");

        let noon = NaiveTime::from_hms_opt(12, 30, 0).expect("time");
        assert_eq!(CellValue::from(noon).to_string(), "12:30:00");

        assert_ne!(CellValue::DateTime(midnight), CellValue::Number(45292.0));
        assert_ne!(CellValue::DateTime(midnight), CellValue::Text("2024-01-01 00:00:00".into()));
    }

    #[test]
    fn content_key_distinguishes_lengths() {
        let short = Row::new(1, vec!["a".into()]);
        let long = Row::new(1, vec!["a".into(), CellValue::Absent]);
        assert_ne!(short.content_key(), long.content_key());
        assert_eq!(short.content_key(), Row::new(9, vec!["a".into()]).content_key());
    }

    #[test]
    fn cell_reads_past_end_as_absent() {
        let row = Row::new(3, vec![1.0.into()]);
        assert_eq!(row.cell(0), &CellValue::Number(1.0));
        assert_eq!(row.cell(5), &CellValue::Absent);
        assert_eq!(row.joined("|"), "1");
    }

    #[test]
    fn from_cells_numbers_rows_from_one() {
        let sheet = Sheet::from_cells("Data", vec![vec!["x".into()], vec![], vec!["y".into()]]);
        let numbers: Vec<u32> = sheet.rows.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(sheet.max_columns(), 1);
    }
}
