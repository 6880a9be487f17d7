//! Separable Gaussian smoothing of a dense grid.
//!
//! The kernel width is driven by a non-negative smoothing level (typically
//! `0..=100`):
//! `σ = level / 100 · 2` cells, truncated at `⌊4σ + 0.5⌋` cells either side.
//! Edges use half-sample symmetric reflection (`d c b a | a b c d | d c b a`).

use crate::surface::dense::DenseGrid;

/// Standard deviation, in grid cells, at smoothing level 100.
const MAX_SIGMA: f64 = 2.0;
/// Kernel truncation in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Gaussian standard deviation for a smoothing level.
pub fn sigma_for_level(level: u32) -> f64 {
    f64::from(level) / 100.0 * MAX_SIGMA
}

/// Normalised Gaussian weights for offsets `-radius..=radius`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5).floor() as usize;
    let weights: Vec<f64> = (-(radius as isize)..=radius as isize)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Map an out-of-range index back into `0..n` by symmetric reflection.
fn reflect(idx: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = idx.rem_euclid(period) as usize;
    if m < n { m } else { 2 * n - 1 - m }
}

fn convolve(line: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = line.len();
    let radius = (kernel.len() / 2) as isize;
    (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * line[reflect(i + k as isize - radius, n)])
                .sum()
        })
        .collect()
}

/// Smooth `grid` at `level` (0 = none, 100 = strongest).
///
/// Level 0, or any level whose kernel radius rounds to zero, returns an
/// exact copy. Axes are unchanged.
pub fn smooth(grid: &DenseGrid, level: u32) -> DenseGrid {
    let sigma = sigma_for_level(level);
    let kernel = if sigma > 0.0 { gaussian_kernel(sigma) } else { vec![1.0] };
    if kernel.len() == 1 {
        return grid.clone();
    }

    let mut out = grid.clone();
    let (n_k, n_t) = grid.shape();
    // Along maturity (within each strike row).
    for row in out.values_mut() {
        *row = convolve(row, &kernel);
    }
    // Along strike (within each maturity column).
    for j in 0..n_t {
        let column: Vec<f64> = out.values().iter().map(|row| row[j]).collect();
        let smoothed = convolve(&column, &kernel);
        for (i, v) in smoothed.into_iter().enumerate().take(n_k) {
            out.values_mut()[i][j] = v;
        }
    }

    #[cfg(feature = "logging")]
    tracing::debug!(level, sigma, radius = kernel.len() / 2, "surface smoothed");

    out
}
