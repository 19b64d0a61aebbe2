//! Row correspondence between two versions of a sheet.
//!
//! Matching runs in two phases:
//! 1. Exact: rows are bucketed by content key and paired in order of
//!    appearance within each bucket.
//! 2. Similarity: every remaining old row, in ascending index order, claims
//!    the remaining new row with the highest similarity score at or above the
//!    configured threshold. A claimed new row leaves the pool immediately, so
//!    earlier old rows win contested candidates.
//!
//! Whatever is still unmatched afterwards is deleted (old) or added (new).

use crate::assignment;
use crate::config::{DiffConfig, MatchStrategy};
use crate::workbook::Row;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Scale applied to similarity scores before handing them to the integer
/// assignment solver.
const OPTIMAL_SCORE_SCALE: f64 = 1_000_000.0;

/// The outcome of matching the rows of one sheet.
///
/// All indices are zero-based positions into the row slices passed to
/// [`match_rows`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowMatches {
    /// Content-identical pairs `(old_idx, new_idx)`, ascending by old index.
    pub exact: Vec<(usize, usize)>,
    /// Similar pairs reported as modifications, in the order old rows were scanned.
    pub similar: Vec<(usize, usize)>,
    /// Old rows with no counterpart, ascending.
    pub unmatched_old: Vec<usize>,
    /// New rows with no counterpart, ascending.
    pub unmatched_new: Vec<usize>,
}

/// Compute row correspondence between `old` and `new`.
pub fn match_rows(old: &[Row], new: &[Row], config: &DiffConfig) -> RowMatches {
    let (exact, unmatched_old, unmatched_new) = find_exact_matches(old, new);

    let (similar, unmatched_old, unmatched_new) = match config.match_strategy {
        MatchStrategy::Greedy => find_similar_greedy(
            old,
            new,
            unmatched_old,
            unmatched_new,
            config.similarity_threshold,
        ),
        MatchStrategy::Optimal => find_similar_optimal(
            old,
            new,
            unmatched_old,
            unmatched_new,
            config.similarity_threshold,
        ),
    };

    log::trace!(
        "row matching: {} exact, {} similar, {} unmatched old, {} unmatched new",
        exact.len(),
        similar.len(),
        unmatched_old.len(),
        unmatched_new.len()
    );

    RowMatches {
        exact,
        similar,
        unmatched_old,
        unmatched_new,
    }
}

/// Fraction of column positions where both rows hold the same defined value.
///
/// The denominator is the longer row's length; two empty rows score 0.
pub fn similarity(old: &Row, new: &Row) -> f64 {
    let max_len = old.len().max(new.len());
    if max_len == 0 {
        return 0.0;
    }

    let matching = old
        .cells
        .iter()
        .zip(new.cells.iter())
        .filter(|(a, b)| !a.is_absent() && a == b)
        .count();

    matching as f64 / max_len as f64
}

type ExactMatches = (Vec<(usize, usize)>, Vec<usize>, Vec<usize>);

pub(crate) fn find_exact_matches(old: &[Row], new: &[Row]) -> ExactMatches {
    let old_keys: Vec<String> = old.iter().map(Row::content_key).collect();
    let new_keys: Vec<String> = new.iter().map(Row::content_key).collect();

    let mut new_buckets: FxHashMap<&str, VecDeque<usize>> = FxHashMap::default();
    for (idx, key) in new_keys.iter().enumerate() {
        new_buckets.entry(key.as_str()).or_default().push_back(idx);
    }

    // Each bucket is consumed front to back, which pairs the k-th old
    // occurrence of a key with the k-th new occurrence.
    let mut exact = Vec::new();
    let mut old_matched = vec![false; old.len()];
    let mut new_matched = vec![false; new.len()];

    for (old_idx, key) in old_keys.iter().enumerate() {
        let Some(new_idx) = new_buckets
            .get_mut(key.as_str())
            .and_then(VecDeque::pop_front)
        else {
            continue;
        };
        exact.push((old_idx, new_idx));
        old_matched[old_idx] = true;
        new_matched[new_idx] = true;
    }

    let unmatched_old = unmatched_indices(&old_matched);
    let unmatched_new = unmatched_indices(&new_matched);
    (exact, unmatched_old, unmatched_new)
}

fn unmatched_indices(matched: &[bool]) -> Vec<usize> {
    matched
        .iter()
        .enumerate()
        .filter_map(|(idx, &m)| (!m).then_some(idx))
        .collect()
}

type SimilarMatches = (Vec<(usize, usize)>, Vec<usize>, Vec<usize>);

fn find_similar_greedy(
    old: &[Row],
    new: &[Row],
    unmatched_old: Vec<usize>,
    unmatched_new: Vec<usize>,
    threshold: f64,
) -> SimilarMatches {
    let mut pool = unmatched_new;
    let mut similar = Vec::new();
    let mut remaining_old = Vec::new();

    for old_idx in unmatched_old {
        let old_row = &old[old_idx];
        let mut best: Option<(usize, f64)> = None;

        for (pos, &new_idx) in pool.iter().enumerate() {
            let score = similarity(old_row, &new[new_idx]);
            if score < threshold {
                continue;
            }
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((pos, score));
            }
        }

        match best {
            Some((pos, _)) => {
                // `remove` keeps the pool in ascending order for later scans.
                let new_idx = pool.remove(pos);
                similar.push((old_idx, new_idx));
            }
            None => remaining_old.push(old_idx),
        }
    }

    (similar, remaining_old, pool)
}

fn find_similar_optimal(
    old: &[Row],
    new: &[Row],
    unmatched_old: Vec<usize>,
    unmatched_new: Vec<usize>,
    threshold: f64,
) -> SimilarMatches {
    if unmatched_old.is_empty() || unmatched_new.is_empty() {
        return (Vec::new(), unmatched_old, unmatched_new);
    }

    let weights: Vec<Vec<i64>> = unmatched_old
        .iter()
        .map(|&old_idx| {
            unmatched_new
                .iter()
                .map(|&new_idx| {
                    let score = similarity(&old[old_idx], &new[new_idx]);
                    if score >= threshold {
                        ((score * OPTIMAL_SCORE_SCALE).round() as i64).max(1)
                    } else {
                        0
                    }
                })
                .collect()
        })
        .collect();

    let mut similar = Vec::new();
    let mut old_paired = vec![false; unmatched_old.len()];
    let mut new_paired = vec![false; unmatched_new.len()];
    for (i, assigned) in assignment::maximize(&weights).into_iter().enumerate() {
        if let Some(j) = assigned {
            similar.push((unmatched_old[i], unmatched_new[j]));
            old_paired[i] = true;
            new_paired[j] = true;
        }
    }

    let remaining_old = unmatched_old
        .iter()
        .zip(&old_paired)
        .filter_map(|(&idx, &paired)| (!paired).then_some(idx))
        .collect();
    let remaining_new = unmatched_new
        .iter()
        .zip(&new_paired)
        .filter_map(|(&idx, &paired)| (!paired).then_some(idx))
        .collect();

    (similar, remaining_old, remaining_new)
}
