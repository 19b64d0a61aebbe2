use crate::config::DiffConfig;
use crate::diff::{DiffError, RowChange, SheetChange, SheetChangeKind, WorkbookDiff};
use crate::workbook::{Sheet, Workbook};
use std::collections::BTreeSet;

use super::sheet_diff::diff_sheet;

/// Diff two workbooks.
///
/// Sheets only in `old` are reported as deleted and sheets only in `new` as
/// added, without row detail. Sheets in both are diffed row by row and only
/// reported when at least one row changed. Entries are ordered by sheet name.
pub fn diff_workbooks(old: &Workbook, new: &Workbook, config: &DiffConfig) -> WorkbookDiff {
    let names: BTreeSet<&str> = old.sheet_names().chain(new.sheet_names()).collect();

    let common: Vec<(&Sheet, &Sheet)> = names
        .iter()
        .filter_map(|name| Some((old.sheet(name)?, new.sheet(name)?)))
        .collect();
    let mut common_changes = diff_common_sheets(&common, config).into_iter();

    let mut sheet_changes = Vec::new();
    for name in names {
        let change = match (old.sheet(name), new.sheet(name)) {
            (Some(_), None) => Some(structural_change(SheetChangeKind::SheetDeleted, name)),
            (None, Some(_)) => Some(structural_change(SheetChangeKind::SheetAdded, name)),
            (Some(_), Some(_)) => common_changes
                .next()
                .and_then(|rows| modified_change(name, rows)),
            (None, None) => None,
        };
        sheet_changes.extend(change);
    }

    log::debug!(
        "diffed '{}' -> '{}': {} sheet changes",
        old.source,
        new.source,
        sheet_changes.len()
    );

    WorkbookDiff {
        old_source: old.source.clone(),
        new_source: new.source.clone(),
        sheet_changes,
    }
}

/// Like [`diff_workbooks`], but rejects an invalid configuration first.
pub fn try_diff_workbooks(
    old: &Workbook,
    new: &Workbook,
    config: &DiffConfig,
) -> Result<WorkbookDiff, DiffError> {
    config.validate()?;
    Ok(diff_workbooks(old, new, config))
}

/// Diff a single named sheet of two workbooks.
///
/// The sheet may exist on either side; it is reported as added or deleted
/// when it exists only on one. Fails when neither workbook has it.
pub fn diff_single_sheet(
    old: &Workbook,
    new: &Workbook,
    sheet_name: &str,
    config: &DiffConfig,
) -> Result<WorkbookDiff, DiffError> {
    config.validate()?;

    let change = match (old.sheet(sheet_name), new.sheet(sheet_name)) {
        (Some(_), None) => Some(structural_change(SheetChangeKind::SheetDeleted, sheet_name)),
        (None, Some(_)) => Some(structural_change(SheetChangeKind::SheetAdded, sheet_name)),
        (Some(old_sheet), Some(new_sheet)) => {
            modified_change(sheet_name, diff_sheet(old_sheet, new_sheet, config))
        }
        (None, None) => {
            let available: BTreeSet<&str> = old.sheet_names().chain(new.sheet_names()).collect();
            return Err(DiffError::SheetNotFound {
                requested: sheet_name.to_string(),
                available: available.into_iter().map(str::to_string).collect(),
            });
        }
    };

    Ok(WorkbookDiff {
        old_source: old.source.clone(),
        new_source: new.source.clone(),
        sheet_changes: change.into_iter().collect(),
    })
}

fn structural_change(kind: SheetChangeKind, name: &str) -> SheetChange {
    SheetChange {
        kind,
        sheet_name: name.to_string(),
        row_changes: Vec::new(),
    }
}

fn modified_change(name: &str, row_changes: Vec<RowChange>) -> Option<SheetChange> {
    if row_changes.is_empty() {
        return None;
    }
    Some(SheetChange {
        kind: SheetChangeKind::Modified,
        sheet_name: name.to_string(),
        row_changes,
    })
}

/// Row-diff every sheet pair, returning results in input order.
#[cfg(not(feature = "parallel"))]
fn diff_common_sheets(pairs: &[(&Sheet, &Sheet)], config: &DiffConfig) -> Vec<Vec<RowChange>> {
    pairs
        .iter()
        .map(|(old, new)| diff_sheet(old, new, config))
        .collect()
}

/// Row-diff every sheet pair on the rayon pool. `collect` keeps input order,
/// so output matches the sequential path.
#[cfg(feature = "parallel")]
fn diff_common_sheets(pairs: &[(&Sheet, &Sheet)], config: &DiffConfig) -> Vec<Vec<RowChange>> {
    use rayon::prelude::*;

    pairs
        .par_iter()
        .map(|(old, new)| diff_sheet(old, new, config))
        .collect()
}
