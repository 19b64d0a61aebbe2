//! JSON serialization of a [`WorkbookDiff`].
//!
//! The document carries the source labels, the derived [`DiffSummary`], and
//! the full sheet/row/cell change tree.

use crate::config::DiffConfig;
use crate::diff::{DiffSummary, SheetChange, WorkbookDiff};
#[cfg(feature = "excel-open-xml")]
use crate::engine::diff_workbooks;
#[cfg(feature = "excel-open-xml")]
use crate::excel_open_xml::{PackageError, open_workbook};
use serde::Serialize;
use std::io::Write;
#[cfg(feature = "excel-open-xml")]
use std::path::Path;

#[derive(Debug, Serialize)]
struct DiffDocument<'a> {
    old_source: &'a str,
    new_source: &'a str,
    summary: DiffSummary,
    sheet_changes: &'a [SheetChange],
}

impl<'a> DiffDocument<'a> {
    fn new(diff: &'a WorkbookDiff) -> Self {
        DiffDocument {
            old_source: &diff.old_source,
            new_source: &diff.new_source,
            summary: diff.summary(),
            sheet_changes: &diff.sheet_changes,
        }
    }
}

pub fn serialize_diff(diff: &WorkbookDiff) -> serde_json::Result<String> {
    serde_json::to_string(&DiffDocument::new(diff))
}

/// Write the diff document to `writer`, followed by a newline.
pub fn write_diff_json<W: Write>(
    writer: &mut W,
    diff: &WorkbookDiff,
    pretty: bool,
) -> serde_json::Result<()> {
    let document = DiffDocument::new(diff);
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, &document)?;
    } else {
        serde_json::to_writer(&mut *writer, &document)?;
    }
    writer.write_all(b"\n").map_err(serde_json::Error::io)
}

/// Open two `.xlsx` files, diff them, and serialize the result.
#[cfg(feature = "excel-open-xml")]
pub fn diff_files_to_json(
    path_a: impl AsRef<Path>,
    path_b: impl AsRef<Path>,
    config: &DiffConfig,
) -> Result<String, PackageError> {
    let old = open_workbook(path_a)?;
    let new = open_workbook(path_b)?;
    let diff = diff_workbooks(&old, &new, config);
    serialize_diff(&diff).map_err(|e| PackageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{CellValue, Sheet, Workbook};
    use serde_json::Value;

    fn single_sheet(source: &str, rows: Vec<Vec<CellValue>>) -> Workbook {
        Workbook::new(source).with_sheet(Sheet::from_cells("Data", rows))
    }

    #[test]
    fn document_has_summary_and_tagged_changes() {
        let old = single_sheet("old.xlsx", vec![vec!["a".into(), 1.0.into()]]);
        let new = single_sheet("new.xlsx", vec![vec!["a".into(), 2.0.into()], vec![true.into()]]);
        let diff = crate::engine::diff_workbooks(&old, &new, &DiffConfig::default());

        let json = serialize_diff(&diff).expect("serialize");
        let value: Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["old_source"], "old.xlsx");
        assert_eq!(value["summary"]["rows_modified"], 1);
        assert_eq!(value["summary"]["rows_added"], 1);

        let sheet = &value["sheet_changes"][0];
        assert_eq!(sheet["kind"], "modified");
        assert_eq!(sheet["sheet_name"], "Data");

        let modified = &sheet["row_changes"][0];
        assert_eq!(modified["kind"], "modified");
        assert_eq!(modified["cell_changes"][0]["column_letter"], "B");
        assert_eq!(modified["cell_changes"][0]["old_value"], "1");
        assert_eq!(modified["cell_changes"][0]["new_value"], "2");

        let added = &sheet["row_changes"][1];
        assert_eq!(added["kind"], "added");
        assert_eq!(added["old_row"], Value::Null);
        assert_eq!(added["new_row"]["cells"][0]["type"], "bool");
    }

    #[test]
    fn written_document_ends_with_newline() {
        let wb = single_sheet("same.xlsx", vec![vec!["x".into()]]);
        let diff = crate::engine::diff_workbooks(&wb, &wb, &DiffConfig::default());
        let mut out = Vec::new();
        write_diff_json(&mut out, &diff, true).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"sheet_changes\": []"));
    }
}
