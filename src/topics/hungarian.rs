// Minimum-cost bipartite assignment (Hungarian algorithm).
//
// Shortest augmenting path formulation with row/column potentials, O(n^2 m)
// for an n x m cost matrix with n <= m. Wider-than-tall matrices are solved
// as-is; taller ones are transposed first, so every row of the smaller side
// receives exactly one column and the total cost is globally minimal.

use anyhow::Result;

/// Solve the rectangular assignment problem.
///
/// Returns `(row, col)` pairs sorted by row. The number of pairs is
/// `min(rows, cols)`. An empty matrix (no rows or no columns) gives no
/// pairs. Ragged rows or non-finite costs are rejected.
pub fn solve_assignment(cost: &[Vec<f64>]) -> Result<Vec<(usize, usize)>> {
    let rows = cost.len();
    let cols = cost.first().map_or(0, Vec::len);

    if cost.iter().any(|r| r.len() != cols) {
        anyhow::bail!("Cost matrix rows have different lengths");
    }
    if cost.iter().flatten().any(|c| !c.is_finite()) {
        anyhow::bail!("Cost matrix contains non-finite values");
    }
    if rows == 0 || cols == 0 {
        return Ok(Vec::new());
    }

    if rows <= cols {
        Ok(solve_wide(cost, rows, cols))
    } else {
        let transposed: Vec<Vec<f64>> = (0..cols)
            .map(|j| (0..rows).map(|i| cost[i][j]).collect())
            .collect();
        let mut pairs: Vec<(usize, usize)> = solve_wide(&transposed, cols, rows)
            .into_iter()
            .map(|(c, r)| (r, c))
            .collect();
        pairs.sort_unstable();
        Ok(pairs)
    }
}

/// Core solver, requires `n <= m`. Indices inside are 1-based with slot 0
/// as the virtual source column.
fn solve_wide(cost: &[Vec<f64>], n: usize, m: usize) -> Vec<(usize, usize)> {
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; m + 1];
    // p[j]: row matched to column j (0 = free)
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
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

        // Augment along the alternating path back to the source.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut pairs: Vec<(usize, usize)> = (1..=m)
        .filter(|&j| p[j] != 0)
        .map(|j| (p[j] - 1, j - 1))
        .collect();
    pairs.sort_unstable();
    pairs
}
