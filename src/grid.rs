use serde::{Deserialize, Serialize};

/// Estimated dot-grid layout. `0 x 0` means no grid could be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
}

impl Grid {
    pub fn is_established(&self) -> bool {
        self.rows > 1 || self.cols > 1
    }
}

/// Most-square factorization of the dot count.
///
/// Returns the divisor pair `rows * cols == n` with the smallest
/// `|rows - cols|`, `rows <= cols`. Fewer than four dots yield `0 x 0`.
pub fn estimate_grid(n: usize) -> Grid {
    if n < 4 {
        return Grid::default();
    }

    let mut best = Grid { rows: 1, cols: n };
    let mut best_diff = n - 1;
    let limit = (n as f64).sqrt().floor() as usize + 1;
    for rows in 1..=limit {
        if n % rows != 0 {
            continue;
        }
        let cols = n / rows;
        let diff = rows.abs_diff(cols);
        if diff < best_diff {
            best = Grid { rows, cols };
            best_diff = diff;
        }
    }
    best
}
