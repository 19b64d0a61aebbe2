//! Diff result types for workbook comparison.
//!
//! This module defines the tree produced by the differ:
//! - [`WorkbookDiff`]: source labels and the ordered [`SheetChange`]s
//! - [`SheetChange`]: one sheet added, deleted, or modified
//! - [`RowChange`]: one row added, deleted, or modified, with its [`CellChange`]s
//! - [`DiffSummary`]: counts derived from the tree
//! - [`DiffError`]: errors that can occur before a diff is produced

use crate::config::ConfigError;
use crate::workbook::Row;
use serde::Serialize;
use thiserror::Error;

/// Errors produced by diffing APIs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiffError {
    #[error("[EXROW_DIFF_001] invalid diff configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("[EXROW_DIFF_002] sheet '{requested}' not found. Available sheets: {}. Suggestion: check the sheet name and casing.", available.join(", "))]
    SheetNotFound {
        requested: String,
        available: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowChangeKind {
    Added,
    Deleted,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetChangeKind {
    SheetAdded,
    SheetDeleted,
    Modified,
}

/// One column whose value differs between two matched rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellChange {
    /// Zero-based column index.
    pub column_index: u32,
    /// Spreadsheet letter label of `column_index` (e.g. `"B"`).
    pub column_letter: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// A change to one row of a sheet.
///
/// Row numbers are 1-based positions in their source sheet. `old_row` is
/// present unless the row was added; `new_row` unless it was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowChange {
    pub kind: RowChangeKind,
    pub sheet_name: String,
    pub old_row_number: Option<u32>,
    pub new_row_number: Option<u32>,
    pub old_row: Option<Row>,
    pub new_row: Option<Row>,
    /// Ordered by column; empty unless `kind` is `Modified`.
    pub cell_changes: Vec<CellChange>,
}

impl RowChange {
    pub fn added(sheet_name: &str, row: &Row) -> RowChange {
        RowChange {
            kind: RowChangeKind::Added,
            sheet_name: sheet_name.to_string(),
            old_row_number: None,
            new_row_number: Some(row.number),
            old_row: None,
            new_row: Some(row.clone()),
            cell_changes: Vec::new(),
        }
    }

    pub fn deleted(sheet_name: &str, row: &Row) -> RowChange {
        RowChange {
            kind: RowChangeKind::Deleted,
            sheet_name: sheet_name.to_string(),
            old_row_number: Some(row.number),
            new_row_number: None,
            old_row: Some(row.clone()),
            new_row: None,
            cell_changes: Vec::new(),
        }
    }

    pub fn modified(
        sheet_name: &str,
        old: &Row,
        new: &Row,
        cell_changes: Vec<CellChange>,
    ) -> RowChange {
        RowChange {
            kind: RowChangeKind::Modified,
            sheet_name: sheet_name.to_string(),
            old_row_number: Some(old.number),
            new_row_number: Some(new.number),
            old_row: Some(old.clone()),
            new_row: Some(new.clone()),
            cell_changes,
        }
    }

    /// The row number shown to users: the new position when there is one.
    pub fn display_row_number(&self) -> Option<u32> {
        self.new_row_number.or(self.old_row_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetChange {
    pub kind: SheetChangeKind,
    pub sheet_name: String,
    /// Empty for `SheetAdded` and `SheetDeleted`.
    pub row_changes: Vec<RowChange>,
}

/// Counts of changes in a [`WorkbookDiff`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub sheets_added: usize,
    pub sheets_deleted: usize,
    pub sheets_modified: usize,
    pub rows_added: usize,
    pub rows_deleted: usize,
    pub rows_modified: usize,
}

impl DiffSummary {
    pub fn total_rows(&self) -> usize {
        self.rows_added + self.rows_deleted + self.rows_modified
    }
}

/// The complete diff between two workbooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkbookDiff {
    pub old_source: String,
    pub new_source: String,
    /// Ordered by sheet name. Sheets without changes are absent.
    pub sheet_changes: Vec<SheetChange>,
}

impl WorkbookDiff {
    pub fn is_empty(&self) -> bool {
        self.sheet_changes.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        self.sheet_changes
            .iter()
            .fold(DiffSummary::default(), |mut summary, sheet| {
                match sheet.kind {
                    SheetChangeKind::SheetAdded => summary.sheets_added += 1,
                    SheetChangeKind::SheetDeleted => summary.sheets_deleted += 1,
                    SheetChangeKind::Modified if !sheet.row_changes.is_empty() => {
                        summary.sheets_modified += 1
                    }
                    SheetChangeKind::Modified => {}
                }
                for row in &sheet.row_changes {
                    match row.kind {
                        RowChangeKind::Added => summary.rows_added += 1,
                        RowChangeKind::Deleted => summary.rows_deleted += 1,
                        RowChangeKind::Modified => summary.rows_modified += 1,
                    }
                }
                summary
            })
    }

    /// Iterate every row change across all sheets, in output order.
    pub fn row_changes(&self) -> impl Iterator<Item = &RowChange> {
        self.sheet_changes.iter().flat_map(|s| s.row_changes.iter())
    }
}
