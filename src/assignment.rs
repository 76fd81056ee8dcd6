use crate::error::{ExplorerError, Result};

/// Minimum-cost perfect matching on a square cost matrix (Hungarian method).
///
/// Returns, for every row, the column assigned to it. Runs in O(n³) using
/// shortest augmenting paths with row and column potentials.
pub fn solve(cost: &[Vec<f64>]) -> Result<Vec<usize>> {
    let n = cost.len();
    if let Some(row) = cost.iter().position(|row| row.len() != n) {
        return Err(ExplorerError::configuration(format!(
            "cost matrix must be square: row {} has {} columns, expected {}",
            row,
            cost[row].len(),
            n
        )));
    }
    if cost.iter().flatten().any(|c| !c.is_finite()) {
        return Err(ExplorerError::configuration("cost matrix must be finite"));
    }

    // 1-based; index 0 is the virtual start column.
    let mut row_potential = vec![0.0; n + 1];
    let mut col_potential = vec![0.0; n + 1];
    let mut matched_row = vec![0usize; n + 1]; // Row matched to each column, 0 when free
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        matched_row[0] = row;
        let mut col = 0;
        let mut min_slack = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[col] = true;
            let current_row = matched_row[col];
            let mut delta = f64::INFINITY;
            let mut next_col = 0;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let slack = cost[current_row - 1][j - 1] - row_potential[current_row] - col_potential[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = col;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    next_col = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    row_potential[matched_row[j]] += delta;
                    col_potential[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }

            col = next_col;
            if matched_row[col] == 0 {
                break;
            }
        }

        // Flip the augmenting path
        loop {
            let previous = way[col];
            matched_row[col] = matched_row[previous];
            col = previous;
            if col == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0; n];
    for col in 1..=n {
        assignment[matched_row[col] - 1] = col - 1;
    }
    Ok(assignment)
}

/// Sum of the costs picked by an assignment of one column to every row.
pub fn total_cost(cost: &[Vec<f64>], assignment: &[usize]) -> Result<f64> {
    if assignment.len() != cost.len() {
        return Err(ExplorerError::configuration(format!(
            "assignment covers {} rows, cost matrix has {}",
            assignment.len(),
            cost.len()
        )));
    }
    assignment
        .iter()
        .zip(cost)
        .map(|(&col, row)| {
            row.get(col).copied().ok_or(ExplorerError::IndexOutOfBounds {
                index: col,
                max: row.len(),
            })
        })
        .sum()
}
