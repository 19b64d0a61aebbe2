//! Cell-level differences between two matched rows.

use crate::addressing::column_letter;
use crate::diff::CellChange;
use crate::workbook::Row;

/// List the columns whose values differ between `old` and `new`.
///
/// Columns past the end of the shorter row read as absent. Changes come out
/// in ascending column order.
pub fn diff_cells(old: &Row, new: &Row) -> Vec<CellChange> {
    let width = old.len().max(new.len());

    (0..width)
        .filter_map(|col| {
            let old_value = old.cell(col);
            let new_value = new.cell(col);
            if old_value == new_value {
                return None;
            }
            let column_index = col as u32;
            Some(CellChange {
                column_index,
                column_letter: column_letter(column_index),
                old_value: old_value.as_text(),
                new_value: new_value.as_text(),
            })
        })
        .collect()
}
