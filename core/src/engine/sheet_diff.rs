use crate::cell_diff::diff_cells;
use crate::config::DiffConfig;
use crate::diff::RowChange;
use crate::row_matching::match_rows;
use crate::workbook::Sheet;

/// Diff two versions of the same sheet into an ordered list of row changes.
///
/// Modified rows come first in the order their old rows were scanned, then
/// deleted rows by ascending old position, then added rows by ascending new
/// position. Identical sheets produce an empty list.
pub fn diff_sheet(old: &Sheet, new: &Sheet, config: &DiffConfig) -> Vec<RowChange> {
    let matches = match_rows(&old.rows, &new.rows, config);
    let sheet_name = old.name.as_str();

    let mut changes = Vec::with_capacity(
        matches.similar.len() + matches.unmatched_old.len() + matches.unmatched_new.len(),
    );

    for &(old_idx, new_idx) in &matches.similar {
        let old_row = &old.rows[old_idx];
        let new_row = &new.rows[new_idx];
        let cell_changes = diff_cells(old_row, new_row);
        changes.push(RowChange::modified(sheet_name, old_row, new_row, cell_changes));
    }

    for &old_idx in &matches.unmatched_old {
        changes.push(RowChange::deleted(sheet_name, &old.rows[old_idx]));
    }

    for &new_idx in &matches.unmatched_new {
        changes.push(RowChange::added(sheet_name, &new.rows[new_idx]));
    }

    log::debug!(
        "sheet '{}': {} rows unchanged, {} modified, {} deleted, {} added",
        sheet_name,
        matches.exact.len(),
        matches.similar.len(),
        matches.unmatched_old.len(),
        matches.unmatched_new.len()
    );

    changes
}
