//! Excel RowDiff: row- and cell-level comparison of Excel workbooks.
//!
//! This crate provides functionality for:
//! - Opening `.xlsx` files into a plain table model (sheets of rows of cells),
//!   with date-formatted numbers read as dates
//! - Matching rows between two versions of a sheet, first by identical
//!   content and then by positional similarity
//! - Reporting added, deleted, and modified rows with per-cell changes
//! - Reading workbook versions out of a git repository
//! - Serializing diffs to JSON
//!
//! # Quick Start
//!
//! ```ignore
//! use excel_rowdiff::{DiffConfig, diff_workbooks, open_workbook};
//!
//! let old = open_workbook("before.xlsx")?;
//! let new = open_workbook("after.xlsx")?;
//! let diff = diff_workbooks(&old, &new, &DiffConfig::default());
//!
//! for row in diff.row_changes() {
//!     println!("{:?} row {:?} in {}", row.kind, row.display_row_number(), row.sheet_name);
//! }
//! ```

mod addressing;
mod assignment;
mod cell_diff;
mod config;
#[cfg(feature = "excel-open-xml")]
mod container;
mod diff;
mod engine;
#[cfg(feature = "excel-open-xml")]
mod excel_open_xml;
#[cfg(feature = "excel-open-xml")]
mod git;
#[cfg(feature = "excel-open-xml")]
mod grid_parser;
pub(crate) mod hashing;
mod output;
mod row_matching;
#[cfg(feature = "excel-open-xml")]
mod styles;
mod workbook;

pub use addressing::{address_to_index, column_letter, index_to_address};
pub use cell_diff::diff_cells;
pub use config::{ConfigError, DiffConfig, DiffConfigBuilder, MatchStrategy};
#[cfg(feature = "excel-open-xml")]
pub use container::{ContainerError, ContainerLimits, OpcContainer};
pub use diff::{
    CellChange, DiffError, DiffSummary, RowChange, RowChangeKind, SheetChange, SheetChangeKind,
    WorkbookDiff,
};
pub use engine::{diff_sheet, diff_single_sheet, diff_workbooks, try_diff_workbooks};
#[cfg(feature = "excel-open-xml")]
pub use excel_open_xml::{
    PackageError, open_workbook, open_workbook_from_bytes, open_workbook_from_reader,
};
#[cfg(feature = "excel-open-xml")]
pub use git::{CommitInfo, GitError, GitRepo};
#[cfg(feature = "excel-open-xml")]
pub use grid_parser::GridParseError;
#[cfg(feature = "excel-open-xml")]
pub use output::json::diff_files_to_json;
pub use output::json::{serialize_diff, write_diff_json};
pub use row_matching::{RowMatches, match_rows, similarity};
#[cfg(feature = "excel-open-xml")]
pub use styles::{CellStyles, DateSystem};
pub use workbook::{CONTENT_KEY_DELIMITER, CellValue, Row, Sheet, Workbook};
