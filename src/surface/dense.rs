//! Dense, evenly spaced volatility grid and its slices.

use serde::{Deserialize, Serialize};

use crate::conventions::{days_from_years, years_from_days};
use crate::error::{self, IvSurfError};

/// `n` evenly spaced points from `start` to `end` inclusive.
///
/// `n == 1` yields `[start]`; `n == 0` yields an empty vector. The last
/// point is exactly `end`.
///
/// # Examples
/// ```
/// use ivsurf::surface::linspace;
/// assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
/// ```
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut axis: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            axis[n - 1] = end;
            axis
        }
    }
}

/// Index of the axis point closest to `x`; the first one wins ties.
pub(crate) fn nearest_index(axis: &[f64], x: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &a) in axis.iter().enumerate() {
        let d = (a - x).abs();
        if !d.is_finite() {
            continue;
        }
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// A volatility grid over evenly spaced strike and maturity axes.
///
/// Values are indexed `[strike][maturity]`. Deserialization applies the
/// same shape checks as [`DenseGrid::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridRecord")]
pub struct DenseGrid {
    strikes: Vec<f64>,
    maturities: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl DenseGrid {
    /// Assemble a grid from axes and values.
    ///
    /// # Errors
    /// Returns [`IvSurfError::InvalidInput`] if either axis is empty or the
    /// value matrix does not have `strikes.len()` rows of
    /// `maturities.len()` columns.
    pub fn new(strikes: Vec<f64>, maturities: Vec<f64>, values: Vec<Vec<f64>>) -> error::Result<Self> {
        if strikes.is_empty() || maturities.is_empty() {
            return Err(IvSurfError::InvalidInput {
                message: "grid axes must be non-empty".into(),
            });
        }
        if values.len() != strikes.len() {
            return Err(IvSurfError::InvalidInput {
                message: format!(
                    "grid has {} rows but {} strikes",
                    values.len(),
                    strikes.len()
                ),
            });
        }
        if let Some((i, row)) = values
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != maturities.len())
        {
            return Err(IvSurfError::InvalidInput {
                message: format!(
                    "grid row {i} has {} columns but {} maturities",
                    row.len(),
                    maturities.len()
                ),
            });
        }
        Ok(Self {
            strikes,
            maturities,
            values,
        })
    }

    /// Shape-checked by the caller.
    pub(crate) fn from_parts(strikes: Vec<f64>, maturities: Vec<f64>, values: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(values.len(), strikes.len());
        Self {
            strikes,
            maturities,
            values,
        }
    }

    /// Strike axis.
    pub fn strikes(&self) -> &[f64] {
        &self.strikes
    }

    /// Maturity axis in years.
    pub fn maturities(&self) -> &[f64] {
        &self.maturities
    }

    /// Vol matrix, `[strike][maturity]`.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Vol at `(strikes()[i], maturities()[j])`.
    pub fn value(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i).and_then(|row| row.get(j)).copied()
    }

    /// `(n_strikes, n_maturities)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.strikes.len(), self.maturities.len())
    }

    /// Whether every cell holds a finite value.
    pub fn is_complete(&self) -> bool {
        self.values.iter().flatten().all(|v| v.is_finite())
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.values
    }

    /// Consume the grid into `(strikes, maturities, values)`.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>, Vec<Vec<f64>>) {
        (self.strikes, self.maturities, self.values)
    }

    /// Volatility smile at the maturity closest to `days` calendar days.
    ///
    /// `xs` are strikes, `ys` vols, `value` the snapped maturity in days.
    pub fn smile_slice(&self, days: f64) -> Option<VolSlice> {
        let j = nearest_index(&self.maturities, years_from_days(days))?;
        Some(VolSlice {
            kind: SliceKind::Smile,
            value: days_from_years(self.maturities[j]),
            xs: self.strikes.clone(),
            ys: self.values.iter().map(|row| row[j]).collect(),
            label: format!("{days}D Volatility Smile"),
        })
    }

    /// Term structure at the strike closest to `strike`.
    ///
    /// `xs` are maturities in days, `ys` vols, `value` the snapped strike.
    pub fn term_slice(&self, strike: f64) -> Option<VolSlice> {
        let i = nearest_index(&self.strikes, strike)?;
        Some(VolSlice {
            kind: SliceKind::Term,
            value: self.strikes[i],
            xs: self.maturities.iter().map(|&t| days_from_years(t)).collect(),
            ys: self.values[i].clone(),
            label: format!("${strike} Term Structure"),
        })
    }
}

/// Which axis a [`VolSlice`] runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceKind {
    /// Fixed maturity, varying strike.
    Smile,
    /// Fixed strike, varying maturity.
    Term,
}

/// A one-dimensional cut through a [`DenseGrid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolSlice {
    /// Slice orientation.
    #[serde(rename = "type")]
    pub kind: SliceKind,
    /// Snapped maturity (days) for a smile, snapped strike for a term slice.
    pub value: f64,
    /// Abscissae.
    #[serde(rename = "x")]
    pub xs: Vec<f64>,
    /// Vols.
    #[serde(rename = "y")]
    pub ys: Vec<f64>,
    /// Human-readable label.
    pub label: String,
}

/// Wire form of [`DenseGrid`].
#[derive(Deserialize)]
struct GridRecord {
    strikes: Vec<f64>,
    maturities: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl TryFrom<GridRecord> for DenseGrid {
    type Error = IvSurfError;

    fn try_from(r: GridRecord) -> Result<Self, Self::Error> {
        DenseGrid::new(r.strikes, r.maturities, r.values)
    }
}
