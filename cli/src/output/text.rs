use anyhow::Result;
use excel_rowdiff::{RowChange, RowChangeKind, SheetChange, SheetChangeKind, WorkbookDiff};
use std::io::Write;

const RULE_WIDTH: usize = 70;

pub fn write_text_report<W: Write>(w: &mut W, diff: &WorkbookDiff) -> Result<()> {
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(w, "{rule}")?;
    writeln!(w, "Excel Diff: {}", diff.new_source)?;
    writeln!(w, "Comparing: {} <-> {}", diff.old_source, diff.new_source)?;
    writeln!(w, "{rule}")?;
    writeln!(w)?;

    if diff.is_empty() {
        writeln!(w, "No changes detected.")?;
        return Ok(());
    }

    for sheet in &diff.sheet_changes {
        write_sheet(w, sheet)?;
    }

    let summary = diff.summary();
    writeln!(w)?;
    writeln!(w, "{rule}")?;
    writeln!(w, "Summary")?;
    writeln!(w, "{rule}")?;
    if summary.sheets_added > 0 {
        writeln!(w, "Sheets added: {}", summary.sheets_added)?;
    }
    if summary.sheets_deleted > 0 {
        writeln!(w, "Sheets deleted: {}", summary.sheets_deleted)?;
    }
    if summary.sheets_modified > 0 {
        writeln!(w, "Sheets modified: {}", summary.sheets_modified)?;
    }
    writeln!(w, "Rows added: {}", summary.rows_added)?;
    writeln!(w, "Rows deleted: {}", summary.rows_deleted)?;
    writeln!(w, "Rows modified: {}", summary.rows_modified)?;

    Ok(())
}

fn write_sheet<W: Write>(w: &mut W, sheet: &SheetChange) -> Result<()> {
    match sheet.kind {
        SheetChangeKind::SheetAdded => {
            writeln!(w, "[Sheet ADDED] {}", sheet.sheet_name)?;
            writeln!(w)?;
        }
        SheetChangeKind::SheetDeleted => {
            writeln!(w, "[Sheet DELETED] {}", sheet.sheet_name)?;
            writeln!(w)?;
        }
        SheetChangeKind::Modified => {
            writeln!(w, "[Sheet: {}]", sheet.sheet_name)?;
            if sheet.row_changes.is_empty() {
                writeln!(w, "  No changes")?;
            }
            for row in &sheet.row_changes {
                write_row(w, row)?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}

fn write_row<W: Write>(w: &mut W, row: &RowChange) -> Result<()> {
    match row.kind {
        RowChangeKind::Added => {
            writeln!(w, "  Row {} ADDED", number(row.new_row_number))?;
            let content = row.new_row.as_ref().map(|r| r.joined("|")).unwrap_or_default();
            writeln!(w, "    + {content}")?;
        }
        RowChangeKind::Deleted => {
            writeln!(w, "  Row {} DELETED", number(row.old_row_number))?;
            let content = row.old_row.as_ref().map(|r| r.joined("|")).unwrap_or_default();
            writeln!(w, "    - {content}")?;
        }
        RowChangeKind::Modified => {
            write!(w, "  Row {} MODIFIED", number(row.new_row_number))?;
            if row.old_row_number != row.new_row_number {
                write!(w, " (was row {})", number(row.old_row_number))?;
            }
            writeln!(w)?;
            for cell in &row.cell_changes {
                writeln!(
                    w,
                    "    Column {}: \"{}\" -> \"{}\"",
                    cell.column_letter,
                    cell.old_value.as_deref().unwrap_or("None"),
                    cell.new_value.as_deref().unwrap_or("None")
                )?;
            }
        }
    }
    Ok(())
}

fn number(n: Option<u32>) -> String {
    n.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string())
}
