mod common;

use common::workbook;
use excel_rowdiff::{
    CellValue, DiffConfig, Row, RowChange, RowChangeKind, Sheet, SheetChangeKind, WorkbookDiff,
    diff_sheet, diff_workbooks, match_rows,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn cell_strategy() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        Just(CellValue::Absent),
        "[abc]".prop_map(CellValue::Text),
        (0i64..3).prop_map(CellValue::from),
        any::<bool>().prop_map(CellValue::Bool),
    ]
}

fn rows_strategy() -> impl Strategy<Value = Vec<Vec<CellValue>>> {
    prop::collection::vec(prop::collection::vec(cell_strategy(), 0..5), 0..10)
}

fn sheet_of(rows: Vec<Vec<CellValue>>) -> Sheet {
    Sheet::from_cells("Data", rows)
}

fn texts(row: &Row, width: usize) -> Vec<Option<String>> {
    (0..width).map(|col| row.cell(col).as_text()).collect()
}

fn row_numbers(changes: &[RowChange], kind: RowChangeKind) -> BTreeSet<u32> {
    changes
        .iter()
        .filter(|c| c.kind == kind)
        .filter_map(|c| c.display_row_number())
        .collect()
}

fn sheet_names(diff: &WorkbookDiff, kind: SheetChangeKind) -> BTreeSet<String> {
    diff.sheet_changes
        .iter()
        .filter(|s| s.kind == kind)
        .map(|s| s.sheet_name.clone())
        .collect()
}

proptest! {
    #[test]
    fn diff_against_self_is_empty(rows in rows_strategy(), other in rows_strategy()) {
        let wb = workbook("wb", vec![sheet_of(rows), Sheet::from_cells("Other", other)]);
        let diff = diff_workbooks(&wb, &wb, &DiffConfig::default());
        prop_assert!(diff.is_empty());
        prop_assert_eq!(diff.summary().total_rows(), 0);
    }

    #[test]
    fn every_row_is_accounted_for_exactly_once(old in rows_strategy(), new in rows_strategy()) {
        let old = sheet_of(old);
        let new = sheet_of(new);
        let matches = match_rows(&old.rows, &new.rows, &DiffConfig::default());

        let mut seen_old: Vec<usize> = matches.exact.iter().map(|p| p.0)
            .chain(matches.similar.iter().map(|p| p.0))
            .chain(matches.unmatched_old.iter().copied())
            .collect();
        seen_old.sort_unstable();
        prop_assert_eq!(seen_old, (0..old.rows.len()).collect::<Vec<_>>());

        let mut seen_new: Vec<usize> = matches.exact.iter().map(|p| p.1)
            .chain(matches.similar.iter().map(|p| p.1))
            .chain(matches.unmatched_new.iter().copied())
            .collect();
        seen_new.sort_unstable();
        prop_assert_eq!(seen_new, (0..new.rows.len()).collect::<Vec<_>>());
    }

    #[test]
    fn matching_is_deterministic(old in rows_strategy(), new in rows_strategy()) {
        let old = sheet_of(old);
        let new = sheet_of(new);
        let config = DiffConfig::default();
        prop_assert_eq!(
            match_rows(&old.rows, &new.rows, &config),
            match_rows(&old.rows, &new.rows, &config)
        );
        prop_assert_eq!(diff_sheet(&old, &new, &config), diff_sheet(&old, &new, &config));
    }

    #[test]
    fn exact_pairs_swap_when_sides_swap(old in rows_strategy(), new in rows_strategy()) {
        let old = sheet_of(old);
        let new = sheet_of(new);
        let config = DiffConfig::default();

        let forward: BTreeSet<(usize, usize)> =
            match_rows(&old.rows, &new.rows, &config).exact.into_iter().collect();
        let backward: BTreeSet<(usize, usize)> = match_rows(&new.rows, &old.rows, &config)
            .exact
            .into_iter()
            .map(|(a, b)| (b, a))
            .collect();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn added_and_deleted_rows_swap_without_similarity_pairing(
        old in rows_strategy(),
        new in rows_strategy(),
    ) {
        let old = sheet_of(old);
        let new = sheet_of(new);
        let config = DiffConfig::builder()
            .similarity_threshold(1.0)
            .build()
            .expect("valid config");

        let forward = diff_sheet(&old, &new, &config);
        let backward = diff_sheet(&new, &old, &config);
        prop_assert_eq!(
            row_numbers(&forward, RowChangeKind::Added),
            row_numbers(&backward, RowChangeKind::Deleted)
        );
        prop_assert_eq!(
            row_numbers(&forward, RowChangeKind::Deleted),
            row_numbers(&backward, RowChangeKind::Added)
        );
    }

    #[test]
    fn cell_changes_rebuild_the_new_row(old in rows_strategy(), new in rows_strategy()) {
        let old = sheet_of(old);
        let new = sheet_of(new);
        for change in diff_sheet(&old, &new, &DiffConfig::default()) {
            if change.kind != RowChangeKind::Modified {
                continue;
            }
            let old_row = change.old_row.as_ref().expect("modified rows carry the old row");
            let new_row = change.new_row.as_ref().expect("modified rows carry the new row");
            let width = old_row.len().max(new_row.len());

            let mut rebuilt = texts(old_row, width);
            for cell in &change.cell_changes {
                rebuilt[cell.column_index as usize] = cell.new_value.clone();
            }
            prop_assert_eq!(rebuilt, texts(new_row, width));
        }
    }

    #[test]
    fn sheet_additions_and_deletions_swap(
        old_names in prop::collection::btree_set("[a-e]", 0..5),
        new_names in prop::collection::btree_set("[a-e]", 0..5),
    ) {
        let build = |source: &str, names: &BTreeSet<String>| {
            workbook(
                source,
                names.iter().map(|n| Sheet::from_cells(n.as_str(), vec![vec!["x".into()]])).collect(),
            )
        };
        let old = build("old", &old_names);
        let new = build("new", &new_names);
        let config = DiffConfig::default();

        let forward = diff_workbooks(&old, &new, &config);
        let backward = diff_workbooks(&new, &old, &config);
        prop_assert_eq!(
            sheet_names(&forward, SheetChangeKind::SheetAdded),
            sheet_names(&backward, SheetChangeKind::SheetDeleted)
        );
        prop_assert_eq!(
            sheet_names(&forward, SheetChangeKind::SheetDeleted),
            sheet_names(&backward, SheetChangeKind::SheetAdded)
        );
        prop_assert!(forward.sheet_changes.iter().all(|s| s.kind != SheetChangeKind::Modified));
    }
}
