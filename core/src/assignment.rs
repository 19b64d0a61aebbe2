//! Linear assignment solver (Hungarian algorithm).
//!
//! Dense O(n^3) over integer weights. Only used by the opt-in optimal
//! matching strategy, where the candidate set is the rows left after exact
//! matching.

/// Pair rows with columns so the summed weight is maximal.
///
/// `weights` is rectangular (`rows x cols`); a weight of 0 means "do not
/// pair". Returns, for every row, the column it was assigned to, or `None`
/// when the row ends up unpaired or paired only through a zero weight.
pub(crate) fn maximize(weights: &[Vec<i64>]) -> Vec<Option<usize>> {
    let rows = weights.len();
    let cols = weights.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return vec![None; rows];
    }
    debug_assert!(weights.iter().all(|row| row.len() == cols));

    // Square cost matrix: maximizing weight is minimizing its negation, and
    // padding cells cost nothing.
    let n = rows.max(cols);
    let cost = |i: usize, j: usize| -> i64 {
        if i < rows && j < cols {
            -weights[i][j]
        } else {
            0
        }
    };

    let inf = i64::MAX / 4;
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; n + 1];
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![inf; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = inf;
            let mut j1 = 0usize;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; rows];
    for j in 1..=n {
        let i = p[j];
        if i > 0 && i <= rows && j <= cols && weights[i - 1][j - 1] > 0 {
            assignment[i - 1] = Some(j - 1);
        }
    }
    assignment
}
