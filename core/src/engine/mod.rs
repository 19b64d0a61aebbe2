//! The diff engine: sheet-level and workbook-level orchestration on top of
//! row matching and cell extraction.

mod sheet_diff;
mod workbook_diff;

pub use sheet_diff::diff_sheet;
pub use workbook_diff::{diff_single_sheet, diff_workbooks, try_diff_workbooks};
