//! Sparse-to-dense surface interpolation with an explicit fallback policy.
//!
//! Each method attempt yields a `Result`; [`select_fallback`] walks the
//! attempts of a [`fallback_plan`] in order and keeps the first success.
//! The plan always ends with [`AppliedMethod::Identity`], which cannot
//! fail, so interpolation of a non-empty grid always produces a surface.
//!
//! | requested   | plan                              |
//! |-------------|-----------------------------------|
//! | `linear`    | linear → identity                 |
//! | `cubic`     | cubic → identity                  |
//! | `nearest`   | nearest → identity                |
//! | `kriging`   | kriging → linear → identity       |
//! | other       | identity                          |
//!
//! Kernels work in normalised coordinates (each axis mapped onto `[0, 1]`)
//! so distances are not dominated by the strike scale.

mod clough_tocher;
mod delaunay;
mod kriging;
mod spline;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{self, IvSurfError};
use crate::surface::dense::{DenseGrid, linspace, nearest_index};
use crate::surface::grid::SparseGrid;
use crate::validate::validate_nonzero;

use clough_tocher::CloughTocher;
use delaunay::Triangulation;
use spline::{Kernel1d, separable};

/// Interpolation method requested by the caller.
///
/// Parsed case-insensitively; unrecognised names are kept verbatim in
/// [`InterpolationMethod::Other`] and produce an identity (uninterpolated)
/// surface.
///
/// # Examples
/// ```
/// use ivsurf::surface::InterpolationMethod;
///
/// assert_eq!(InterpolationMethod::from_name("Kriging"), InterpolationMethod::Kriging);
/// assert_eq!(InterpolationMethod::from_name("rbf").name(), "rbf");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InterpolationMethod {
    /// Piecewise-linear over a Delaunay triangulation.
    Linear,
    /// Clough-Tocher C¹ cubic over a Delaunay triangulation.
    #[default]
    Cubic,
    /// Nearest observed node.
    Nearest,
    /// Ordinary kriging, falling back to linear on failure.
    Kriging,
    /// Any other name: no interpolation.
    Other(String),
}

impl InterpolationMethod {
    /// Parse a method name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "linear" => Self::Linear,
            "cubic" => Self::Cubic,
            "nearest" => Self::Nearest,
            "kriging" => Self::Kriging,
            _ => Self::Other(lower),
        }
    }

    /// Lowercase name.
    pub fn name(&self) -> &str {
        match self {
            Self::Linear => "linear",
            Self::Cubic => "cubic",
            Self::Nearest => "nearest",
            Self::Kriging => "kriging",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for InterpolationMethod {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl From<InterpolationMethod> for String {
    fn from(m: InterpolationMethod) -> Self {
        m.name().to_string()
    }
}

/// The method that actually produced a dense grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppliedMethod {
    /// Delaunay-linear.
    Linear,
    /// Clough-Tocher cubic.
    Cubic,
    /// Nearest observed node.
    Nearest,
    /// Ordinary kriging.
    Kriging,
    /// Sparse values snapped onto the dense axes without interpolation.
    Identity,
}

/// Ordered methods to try for a requested method.
pub fn fallback_plan(method: &InterpolationMethod) -> &'static [AppliedMethod] {
    use AppliedMethod as A;
    match method {
        InterpolationMethod::Linear => &[A::Linear, A::Identity],
        InterpolationMethod::Cubic => &[A::Cubic, A::Identity],
        InterpolationMethod::Nearest => &[A::Nearest, A::Identity],
        InterpolationMethod::Kriging => &[A::Kriging, A::Linear, A::Identity],
        InterpolationMethod::Other(_) => &[A::Identity],
    }
}

/// Cell values indexed `[strike][maturity]`, NaN where unresolved.
pub type GridValues = Vec<Vec<f64>>;

/// Outcome of one method attempt.
#[derive(Debug)]
pub struct Attempt {
    /// Method tried.
    pub method: AppliedMethod,
    /// Grid it produced, or why it failed.
    pub outcome: error::Result<GridValues>,
}

/// Keep the first successful attempt.
///
/// Attempts are consumed lazily, so later methods in the plan are only
/// computed when every earlier one failed.
pub fn select_fallback<I>(attempts: I) -> Option<(AppliedMethod, GridValues)>
where
    I: IntoIterator<Item = Attempt>,
{
    for attempt in attempts {
        match attempt.outcome {
            Ok(values) => return Some((attempt.method, values)),
            Err(_err) => {
                #[cfg(feature = "logging")]
                tracing::warn!(method = ?attempt.method, error = %_err, "interpolation attempt failed, falling back");
            }
        }
    }
    None
}

/// A dense grid together with the method that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolated {
    /// Complete dense grid; unresolved cells hold the observed mean.
    pub grid: DenseGrid,
    /// Method that succeeded.
    pub applied: AppliedMethod,
}

impl Interpolated {
    /// Whether the grid came from the identity fallback rather than a real
    /// interpolator.
    pub fn is_degraded(&self) -> bool {
        self.applied == AppliedMethod::Identity
    }
}

/// Interpolate a sparse grid onto `resolution × resolution` evenly spaced
/// axes spanning the observed strike and maturity ranges.
///
/// Every unresolved cell is filled with the mean of the observed values, so
/// the result is always complete.
///
/// # Errors
/// Returns [`IvSurfError::InvalidInput`] if `resolution == 0` and
/// [`IvSurfError::EmptySurface`] if `sparse` has no observed cell.
pub fn interpolate(
    sparse: &SparseGrid,
    method: &InterpolationMethod,
    resolution: usize,
) -> error::Result<Interpolated> {
    validate_nonzero(resolution, "resolution")?;
    let fill = sparse.mean().ok_or_else(|| IvSurfError::EmptySurface {
        message: "sparse grid has no observed cells".into(),
    })?;

    let observed = Observed::new(sparse);
    let strikes = linspace(observed.k_min, observed.k_max, resolution);
    let maturities = linspace(observed.t_min, observed.t_max, resolution);

    let attempts = fallback_plan(method).iter().map(|&m| Attempt {
        method: m,
        outcome: run_method(m, sparse, &observed, &strikes, &maturities),
    });
    let (applied, mut values) = select_fallback(attempts)
        .unwrap_or_else(|| (AppliedMethod::Identity, identity(&observed, &strikes, &maturities)));

    for v in values.iter_mut().flatten() {
        if !v.is_finite() {
            *v = fill;
        }
    }

    #[cfg(feature = "logging")]
    {
        if applied == AppliedMethod::Identity {
            tracing::warn!(requested = %method, "surface not interpolated, identity fallback used");
        }
        tracing::debug!(requested = %method, applied = ?applied, resolution, "interpolation complete");
    }

    Ok(Interpolated {
        grid: DenseGrid::from_parts(strikes, maturities, values),
        applied,
    })
}

fn run_method(
    method: AppliedMethod,
    sparse: &SparseGrid,
    observed: &Observed,
    strikes: &[f64],
    maturities: &[f64],
) -> error::Result<GridValues> {
    match method {
        AppliedMethod::Linear => linear(sparse, observed, strikes, maturities),
        AppliedMethod::Cubic => cubic(sparse, observed, strikes, maturities),
        AppliedMethod::Nearest => Ok(nearest(observed, strikes, maturities)),
        AppliedMethod::Kriging => {
            let xs: Vec<f64> = strikes.iter().map(|&k| observed.norm_k(k)).collect();
            let ys: Vec<f64> = maturities.iter().map(|&t| observed.norm_t(t)).collect();
            kriging::ordinary_kriging(&observed.unit, &observed.values, &xs, &ys)
        }
        AppliedMethod::Identity => Ok(identity(observed, strikes, maturities)),
    }
}

/// Observed nodes in raw and normalised coordinates.
struct Observed {
    raw: Vec<(f64, f64)>,
    unit: Vec<(f64, f64)>,
    values: Vec<f64>,
    k_min: f64,
    k_max: f64,
    t_min: f64,
    t_max: f64,
}

impl Observed {
    fn new(sparse: &SparseGrid) -> Self {
        let points = sparse.points();
        let raw: Vec<(f64, f64)> = points.iter().map(|p| (p.strike, p.maturity)).collect();
        let values: Vec<f64> = points.iter().map(|p| p.implied_vol).collect();
        let (k_min, k_max) = bounds(raw.iter().map(|p| p.0));
        let (t_min, t_max) = bounds(raw.iter().map(|p| p.1));
        let mut observed = Self {
            raw,
            unit: Vec::new(),
            values,
            k_min,
            k_max,
            t_min,
            t_max,
        };
        observed.unit = observed
            .raw
            .iter()
            .map(|&(k, t)| (observed.norm_k(k), observed.norm_t(t)))
            .collect();
        observed
    }

    fn norm_k(&self, k: f64) -> f64 {
        normalise(k, self.k_min, self.k_max)
    }

    fn norm_t(&self, t: f64) -> f64 {
        normalise(t, self.t_min, self.t_max)
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn normalise(x: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo { (x - lo) / (hi - lo) } else { 0.0 }
}

/// Whether all observations share one strike or one maturity, leaving
/// nothing to triangulate.
fn is_single_axis(sparse: &SparseGrid) -> bool {
    sparse.strikes().len() < 2 || sparse.maturities().len() < 2
}

/// Evaluate `f` in normalised coordinates at every dense cell.
fn on_grid(
    observed: &Observed,
    strikes: &[f64],
    maturities: &[f64],
    f: impl Fn((f64, f64)) -> f64,
) -> GridValues {
    strikes
        .iter()
        .map(|&k| {
            maturities
                .iter()
                .map(|&t| f((observed.norm_k(k), observed.norm_t(t))))
                .collect()
        })
        .collect()
}

/// Delaunay-linear; a single strike or maturity degrades to 1-D linear.
fn linear(
    sparse: &SparseGrid,
    observed: &Observed,
    strikes: &[f64],
    maturities: &[f64],
) -> error::Result<GridValues> {
    if is_single_axis(sparse) {
        return Ok(separable(sparse, strikes, maturities, Kernel1d::Linear));
    }
    let tri = Triangulation::new(&observed.unit)?;
    Ok(on_grid(observed, strikes, maturities, |p| tri.interpolate(&observed.values, p)))
}

/// Clough-Tocher over the same triangulation as [`linear`], so every cell
/// inside the hull is resolved; a single strike or maturity degrades to a
/// 1-D natural spline.
fn cubic(
    sparse: &SparseGrid,
    observed: &Observed,
    strikes: &[f64],
    maturities: &[f64],
) -> error::Result<GridValues> {
    if is_single_axis(sparse) {
        return Ok(separable(sparse, strikes, maturities, Kernel1d::Cubic));
    }
    let tri = Triangulation::new(&observed.unit)?;
    let ct = CloughTocher::new(&tri, &observed.values);
    Ok(on_grid(observed, strikes, maturities, |p| ct.eval(p)))
}

/// Value of the closest observed node (first in strike-major order on ties).
fn nearest(observed: &Observed, strikes: &[f64], maturities: &[f64]) -> GridValues {
    strikes
        .iter()
        .map(|&k| {
            maturities
                .iter()
                .map(|&t| {
                    let p = (observed.norm_k(k), observed.norm_t(t));
                    let mut best = (f64::INFINITY, f64::NAN);
                    for (u, &v) in observed.unit.iter().zip(&observed.values) {
                        let d2 = (u.0 - p.0).powi(2) + (u.1 - p.1).powi(2);
                        if d2 < best.0 {
                            best = (d2, v);
                        }
                    }
                    best.1
                })
                .collect()
        })
        .collect()
}

/// Snap each observed node onto its nearest dense cell; collisions are
/// averaged and untouched cells stay NaN.
fn identity(observed: &Observed, strikes: &[f64], maturities: &[f64]) -> GridValues {
    let mut sums = vec![vec![0.0; maturities.len()]; strikes.len()];
    let mut counts = vec![vec![0usize; maturities.len()]; strikes.len()];
    for (&(k, t), &v) in observed.raw.iter().zip(&observed.values) {
        if let (Some(i), Some(j)) = (nearest_index(strikes, k), nearest_index(maturities, t)) {
            sums[i][j] += v;
            counts[i][j] += 1;
        }
    }
    sums.into_iter()
        .zip(counts)
        .map(|(row, cnt)| {
            row.into_iter()
                .zip(cnt)
                .map(|(s, c)| if c > 0 { s / c as f64 } else { f64::NAN })
                .collect()
        })
        .collect()
}
