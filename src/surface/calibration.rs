//! Goodness of fit of a dense surface against the market quotes it was
//! built from.

use serde::{Deserialize, Serialize};

use crate::quote::SolvedQuote;
use crate::surface::dense::{DenseGrid, nearest_index};

/// Fit statistics of model vols against market vols.
///
/// Errors are `model − market` in vol points. All fields are zero when no
/// quote could be matched to a finite grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Largest absolute error.
    pub max_error: f64,
    /// `1 − SSE / SST`; zero when market vols have no dispersion.
    pub r_squared: f64,
    /// Quotes that contributed.
    pub n_points: usize,
}

/// Compare `grid` with the market implied vols of `quotes`.
///
/// Each quote is mapped to the grid cell whose strike is nearest its strike
/// and whose maturity is nearest its maturity, each axis chosen on its own
/// (first index on ties). On non-uniform axes this may pick a cell that is
/// not the nearest in the plane.
pub fn evaluate(grid: &DenseGrid, quotes: &[SolvedQuote]) -> CalibrationReport {
    let pairs: Vec<(f64, f64)> = quotes
        .iter()
        .filter_map(|q| {
            let i = nearest_index(grid.strikes(), q.strike)?;
            let j = nearest_index(grid.maturities(), q.time_to_maturity)?;
            let model = grid.value(i, j).filter(|v| v.is_finite())?;
            let market = q.implied_vol.0;
            market.is_finite().then_some((model, market))
        })
        .collect();

    if pairs.is_empty() {
        return CalibrationReport::default();
    }

    let n = pairs.len() as f64;
    let errors: Vec<f64> = pairs.iter().map(|(model, market)| model - market).collect();
    let sse: f64 = errors.iter().map(|e| e * e).sum();
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let max_error = errors.iter().map(|e| e.abs()).fold(0.0, f64::max);

    let mean_market = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let sst: f64 = pairs.iter().map(|p| (p.1 - mean_market).powi(2)).sum();
    let r_squared = if sst > 0.0 { 1.0 - sse / sst } else { 0.0 };

    let report = CalibrationReport {
        rmse: (sse / n).sqrt(),
        mae,
        max_error,
        r_squared,
        n_points: pairs.len(),
    };

    #[cfg(feature = "logging")]
    tracing::debug!(rmse = report.rmse, r_squared = report.r_squared, n_points = report.n_points, "calibration evaluated");

    report
}
