//! Ordinary kriging with a linear variogram.
//!
//! The variogram `γ(h) = slope·h + nugget` is fitted by least squares to a
//! binned experimental semivariogram. Estimates solve the ordinary kriging
//! system
//!
//! ```text
//! [ -Γ  1 ] [ w ]   [ -γ(d) ]
//! [ 1ᵀ  0 ] [ μ ] = [   1   ]
//! ```
//!
//! with `Γᵢⱼ = γ(|xᵢ − xⱼ|)` and a zero diagonal, so observed nodes are
//! reproduced exactly.
//!
//! # References
//! - Kitanidis, P.K. "Introduction to Geostatistics" (1997), Ch. 3

use nalgebra::{DMatrix, DVector};

use crate::error::{self, IvSurfError};

/// Number of lag bins in the experimental variogram.
const N_LAGS: usize = 6;
/// Distances below this are treated as coincident with a data point.
const ZERO_DISTANCE: f64 = 1e-10;

/// Fitted linear variogram `γ(h) = slope·h + nugget`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LinearVariogram {
    pub slope: f64,
    pub nugget: f64,
}

impl LinearVariogram {
    fn gamma(&self, h: f64) -> f64 {
        self.slope * h + self.nugget
    }

    /// Least-squares fit to an experimental semivariogram of `(x, y, z)` data.
    ///
    /// # Errors
    /// Returns [`IvSurfError::NumericalError`] for fewer than 2 points or a
    /// flat (all-zero) variogram.
    pub(crate) fn fit(points: &[(f64, f64)], values: &[f64]) -> error::Result<Self> {
        let n = points.len();
        if n < 2 {
            return Err(IvSurfError::NumericalError {
                message: format!("kriging needs at least 2 points, got {n}"),
            });
        }

        let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in i + 1..n {
                pairs.push((distance(points[i], points[j]), 0.5 * (values[i] - values[j]).powi(2)));
            }
        }

        let d_min = pairs.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let d_max = pairs.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let width = (d_max - d_min) / N_LAGS as f64;
        let mut edges: Vec<f64> = (0..N_LAGS).map(|k| d_min + k as f64 * width).collect();
        edges.push(d_max + 0.001);

        let (lags, semivariances): (Vec<f64>, Vec<f64>) = edges
            .windows(2)
            .filter_map(|w| {
                let in_bin: Vec<&(f64, f64)> =
                    pairs.iter().filter(|p| p.0 >= w[0] && p.0 < w[1]).collect();
                if in_bin.is_empty() {
                    return None;
                }
                let m = in_bin.len() as f64;
                Some((
                    in_bin.iter().map(|p| p.0).sum::<f64>() / m,
                    in_bin.iter().map(|p| p.1).sum::<f64>() / m,
                ))
            })
            .unzip();

        let variogram = fit_linear(&lags, &semivariances)?;
        if !(variogram.slope > 0.0 || variogram.nugget > 0.0) {
            return Err(IvSurfError::NumericalError {
                message: "flat variogram, kriging system is singular".into(),
            });
        }
        Ok(variogram)
    }
}

/// Non-negative least-squares fit of `γ = slope·h + nugget`.
fn fit_linear(lags: &[f64], semivariances: &[f64]) -> error::Result<LinearVariogram> {
    let mean_h = lags.iter().sum::<f64>() / lags.len() as f64;
    let mean_g = semivariances.iter().sum::<f64>() / semivariances.len() as f64;

    let (mut slope, mut nugget) = if lags.len() < 2 {
        (if mean_h > 0.0 { mean_g / mean_h } else { 0.0 }, 0.0)
    } else {
        let m = lags.len();
        let a = DMatrix::<f64>::from_fn(m, 2, |i, j| if j == 0 { lags[i] } else { 1.0 });
        let b = DVector::<f64>::from_column_slice(semivariances);
        let ata = a.transpose() * &a;
        let atb = a.transpose() * b;
        let x = ata.qr().solve(&atb).ok_or_else(|| IvSurfError::NumericalError {
            message: "variogram least-squares system is singular".into(),
        })?;
        (x[0], x[1])
    };

    if slope < 0.0 {
        slope = 0.0;
        nugget = mean_g;
    }
    if nugget < 0.0 {
        nugget = 0.0;
        let hh: f64 = lags.iter().map(|h| h * h).sum();
        let hg: f64 = lags.iter().zip(semivariances).map(|(h, g)| h * g).sum();
        slope = if hh > 0.0 { (hg / hh).max(0.0) } else { 0.0 };
    }

    if !slope.is_finite() || !nugget.is_finite() {
        return Err(IvSurfError::NumericalError {
            message: format!("non-finite variogram fit: slope={slope}, nugget={nugget}"),
        });
    }
    Ok(LinearVariogram { slope, nugget })
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Ordinary kriging estimates at every `(x, y)` of the target grid.
///
/// Returns values indexed `[x][y]`.
///
/// # Errors
/// Returns [`IvSurfError::NumericalError`] when the variogram cannot be
/// fitted, the kriging matrix is singular, or any estimate is non-finite.
pub(crate) fn ordinary_kriging(
    points: &[(f64, f64)],
    values: &[f64],
    target_x: &[f64],
    target_y: &[f64],
) -> error::Result<Vec<Vec<f64>>> {
    let variogram = LinearVariogram::fit(points, values)?;
    let n = points.len();

    let a = DMatrix::<f64>::from_fn(n + 1, n + 1, |i, j| match (i < n, j < n) {
        (true, true) if i == j => 0.0,
        (true, true) => -variogram.gamma(distance(points[i], points[j])),
        (false, false) => 0.0,
        _ => 1.0,
    });
    let lu = a.lu();
    if !lu.is_invertible() {
        return Err(IvSurfError::NumericalError {
            message: "kriging matrix is singular".into(),
        });
    }

    let mut grid = Vec::with_capacity(target_x.len());
    for &x in target_x {
        let mut row = Vec::with_capacity(target_y.len());
        for &y in target_y {
            let b = DVector::<f64>::from_fn(n + 1, |i, _| {
                if i == n {
                    return 1.0;
                }
                let d = distance(points[i], (x, y));
                if d <= ZERO_DISTANCE { 0.0 } else { -variogram.gamma(d) }
            });
            let w = lu.solve(&b).ok_or_else(|| IvSurfError::NumericalError {
                message: "kriging system solve failed".into(),
            })?;
            let estimate: f64 = (0..n).map(|i| w[i] * values[i]).sum();
            if !estimate.is_finite() {
                return Err(IvSurfError::NumericalError {
                    message: format!("non-finite kriging estimate at ({x}, {y})"),
                });
            }
            row.push(estimate);
        }
        grid.push(row);
    }

    #[cfg(feature = "logging")]
    tracing::debug!(
        n_points = n,
        slope = variogram.slope,
        nugget = variogram.nugget,
        "kriging complete"
    );

    Ok(grid)
}
