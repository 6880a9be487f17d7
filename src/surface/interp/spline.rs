//! One-dimensional kernels and the separable (strike, then maturity) scheme
//! built on them.
//!
//! The cubic kernel is a natural cubic spline solved with the Thomas
//! algorithm (O(n) tridiagonal solver) with `S''(x₀) = S''(xₙ₋₁) = 0`.
//! Neither kernel extrapolates: targets outside the knot range are NaN.

use crate::surface::grid::SparseGrid;

/// Coefficients for one cubic polynomial interval.
///
/// On interval \[xᵢ, xᵢ₊₁\]: `S(x) = a + b·(x - xᵢ) + c·(x - xᵢ)² + d·(x - xᵢ)³`
#[derive(Debug, Clone, Copy)]
struct SplineCoeff {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

/// Natural cubic spline through strictly increasing knots.
#[derive(Debug, Clone)]
pub(crate) struct NaturalSpline {
    xs: Vec<f64>,
    coeffs: Vec<SplineCoeff>,
    y_last: f64,
}

impl NaturalSpline {
    /// Fit a spline; `None` unless there are at least 2 strictly increasing knots.
    pub(crate) fn new(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() < 2 || xs.len() != ys.len() || xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }
        Some(Self {
            xs: xs.to_vec(),
            coeffs: build_spline_coefficients(xs, ys),
            y_last: ys[ys.len() - 1],
        })
    }

    /// Value at `x`; NaN outside the knot range.
    pub(crate) fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if !(x >= self.xs[0] && x <= self.xs[n - 1]) {
            return f64::NAN;
        }
        if x == self.xs[n - 1] {
            return self.y_last;
        }
        let i = self.xs.partition_point(|&k| k <= x) - 1;
        let dx = x - self.xs[i];
        let c = &self.coeffs[i];
        // Horner form: a + dx*(b + dx*(c + dx*d))
        c.a + dx * (c.b + dx * (c.c + dx * c.d))
    }
}

/// Solve the natural cubic spline tridiagonal system and return
/// per-interval coefficients.
fn build_spline_coefficients(x: &[f64], y: &[f64]) -> Vec<SplineCoeff> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    // Second-derivative coefficients, c[0] = c[n-1] = 0.
    let mut c = vec![0.0; n];

    if n > 2 {
        let m = n - 2;
        let mut diag = vec![0.0; m];
        let mut rhs = vec![0.0; m];

        for j in 0..m {
            let i = j + 1;
            diag[j] = 2.0 * (h[i - 1] + h[i]);
            rhs[j] = 3.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }

        // Forward sweep
        for j in 1..m {
            let w = h[j] / diag[j - 1];
            diag[j] -= w * h[j];
            rhs[j] -= w * rhs[j - 1];
        }

        // Back substitution
        c[m] = rhs[m - 1] / diag[m - 1];
        for j in (0..m - 1).rev() {
            let i = j + 1;
            c[i] = (rhs[j] - h[j + 1] * c[i + 1]) / diag[j];
        }
    }

    (0..n - 1)
        .map(|i| SplineCoeff {
            a: y[i],
            b: (y[i + 1] - y[i]) / h[i] - h[i] * (2.0 * c[i] + c[i + 1]) / 3.0,
            c: c[i],
            d: (c[i + 1] - c[i]) / (3.0 * h[i]),
        })
        .collect()
}

/// Piecewise-linear value at `x`; NaN outside `[xs[0], xs[n-1]]`.
fn linear_at(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    if !(x >= xs[0] && x <= xs[n - 1]) {
        return f64::NAN;
    }
    if x == xs[n - 1] {
        return ys[n - 1];
    }
    let i = xs.partition_point(|&k| k <= x) - 1;
    let alpha = (x - xs[i]) / (xs[i + 1] - xs[i]);
    (1.0 - alpha) * ys[i] + alpha * ys[i + 1]
}

/// A one-dimensional interpolation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kernel1d {
    Linear,
    Cubic,
}

impl Kernel1d {
    /// Evaluate the kernel through knots `(xs, ys)` at every target.
    ///
    /// Knots must be strictly increasing. A single knot only resolves
    /// targets equal to it.
    pub(crate) fn eval_many(self, xs: &[f64], ys: &[f64], targets: &[f64]) -> Vec<f64> {
        match xs.len() {
            0 => vec![f64::NAN; targets.len()],
            1 => targets
                .iter()
                .map(|&t| if t == xs[0] { ys[0] } else { f64::NAN })
                .collect(),
            2 => targets.iter().map(|&t| linear_at(xs, ys, t)).collect(),
            _ => match self {
                Kernel1d::Linear => targets.iter().map(|&t| linear_at(xs, ys, t)).collect(),
                Kernel1d::Cubic => match NaturalSpline::new(xs, ys) {
                    Some(spline) => targets.iter().map(|&t| spline.eval(t)).collect(),
                    None => vec![f64::NAN; targets.len()],
                },
            },
        }
    }
}

/// Interpolate across strike within each observed maturity, then across
/// maturity at each target strike. Unresolved cells are NaN.
pub(crate) fn separable(
    grid: &SparseGrid,
    target_strikes: &[f64],
    target_maturities: &[f64],
    kernel: Kernel1d,
) -> Vec<Vec<f64>> {
    let n_obs_t = grid.maturities().len();

    // columns[j][i]: value at target strike i on observed maturity j
    let columns: Vec<Vec<f64>> = (0..n_obs_t)
        .map(|j| {
            let (ks, vs): (Vec<f64>, Vec<f64>) = grid
                .strikes()
                .iter()
                .enumerate()
                .filter_map(|(i, &k)| grid.value(i, j).map(|v| (k, v)))
                .unzip();
            kernel.eval_many(&ks, &vs, target_strikes)
        })
        .collect();

    (0..target_strikes.len())
        .map(|i| {
            let (ts, vs): (Vec<f64>, Vec<f64>) = grid
                .maturities()
                .iter()
                .zip(&columns)
                .filter_map(|(&t, col)| col[i].is_finite().then_some((t, col[i])))
                .unzip();
            kernel.eval_many(&ts, &vs, target_maturities)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn spline_passes_through_knots() {
        let xs = [80.0, 90.0, 100.0, 110.0, 120.0];
        let ys = [0.28, 0.23, 0.20, 0.22, 0.27];
        let s = NaturalSpline::new(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_abs_diff_eq!(s.eval(*x), *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn spline_reproduces_a_line() {
        let xs = [0.0, 1.0, 2.5, 4.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        let s = NaturalSpline::new(&xs, &ys).unwrap();
        assert_abs_diff_eq!(s.eval(1.7), 4.4, epsilon = 1e-12);
        assert_abs_diff_eq!(s.eval(3.3), 7.6, epsilon = 1e-12);
    }

    #[test]
    fn spline_does_not_extrapolate() {
        let s = NaturalSpline::new(&[0.0, 1.0, 2.0], &[1.0, 2.0, 1.0]).unwrap();
        assert!(s.eval(-0.1).is_nan());
        assert!(s.eval(2.1).is_nan());
        assert!(s.eval(f64::NAN).is_nan());
    }

    #[test]
    fn spline_rejects_bad_knots() {
        assert!(NaturalSpline::new(&[1.0], &[1.0]).is_none());
        assert!(NaturalSpline::new(&[1.0, 1.0, 2.0], &[1.0, 1.0, 1.0]).is_none());
        assert!(NaturalSpline::new(&[1.0, 2.0], &[1.0]).is_none());
    }

    #[test]
    fn linear_kernel_midpoint() {
        let out = Kernel1d::Linear.eval_many(&[0.0, 1.0, 3.0], &[0.0, 1.0, 0.0], &[0.5, 2.0, 3.0, 4.0]);
        assert_abs_diff_eq!(out[0], 0.5);
        assert_abs_diff_eq!(out[1], 0.5);
        assert_abs_diff_eq!(out[2], 0.0);
        assert!(out[3].is_nan());
    }

    #[test]
    fn single_knot_only_resolves_itself() {
        let out = Kernel1d::Cubic.eval_many(&[2.0], &[0.3], &[2.0, 2.5]);
        assert_eq!(out[0], 0.3);
        assert!(out[1].is_nan());
    }
}
