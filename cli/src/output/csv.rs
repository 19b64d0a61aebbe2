use anyhow::Result;
use excel_rowdiff::{RowChange, RowChangeKind, SheetChangeKind, WorkbookDiff};
use std::io::Write;

const HEADER: [&str; 9] = [
    "type",
    "sheet",
    "old_row",
    "new_row",
    "column",
    "cell",
    "old_value",
    "new_value",
    "description",
];

pub fn write_csv_report<W: Write>(w: &mut W, diff: &WorkbookDiff) -> Result<()> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(HEADER)?;

    for sheet in &diff.sheet_changes {
        match sheet.kind {
            SheetChangeKind::SheetAdded => writer.write_record([
                "sheet_added",
                sheet.sheet_name.as_str(),
                "",
                "",
                "",
                "",
                "",
                "",
                "Sheet added",
            ])?,
            SheetChangeKind::SheetDeleted => writer.write_record([
                "sheet_deleted",
                sheet.sheet_name.as_str(),
                "",
                "",
                "",
                "",
                "",
                "",
                "Sheet deleted",
            ])?,
            SheetChangeKind::Modified => {
                for row in &sheet.row_changes {
                    write_row(&mut writer, row)?;
                }
            }
        }
    }

    writer.flush()?;
    Ok(())
}

fn write_row<W: Write>(writer: &mut csv::Writer<W>, row: &RowChange) -> Result<()> {
    let old_row = row.old_row_number.map(|n| n.to_string()).unwrap_or_default();
    let new_row = row.new_row_number.map(|n| n.to_string()).unwrap_or_default();

    match row.kind {
        RowChangeKind::Added => {
            let content = row.new_row.as_ref().map(|r| r.joined("|")).unwrap_or_default();
            writer.write_record([
                "row_added",
                row.sheet_name.as_str(),
                old_row.as_str(),
                new_row.as_str(),
                "",
                "",
                "",
                content.as_str(),
                "Row added",
            ])?;
        }
        RowChangeKind::Deleted => {
            let content = row.old_row.as_ref().map(|r| r.joined("|")).unwrap_or_default();
            writer.write_record([
                "row_deleted",
                row.sheet_name.as_str(),
                old_row.as_str(),
                new_row.as_str(),
                "",
                "",
                content.as_str(),
                "",
                "Row deleted",
            ])?;
        }
        RowChangeKind::Modified => {
            for cell in &row.cell_changes {
                let address = format!("{}{}", cell.column_letter, new_row);
                writer.write_record([
                    "cell_modified",
                    row.sheet_name.as_str(),
                    old_row.as_str(),
                    new_row.as_str(),
                    cell.column_letter.as_str(),
                    address.as_str(),
                    cell.old_value.as_deref().unwrap_or(""),
                    cell.new_value.as_deref().unwrap_or(""),
                    "Cell modified",
                ])?;
            }
        }
    }
    Ok(())
}
