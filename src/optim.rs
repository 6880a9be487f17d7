//! Internal root-finding utilities for implied volatility extraction.

/// Configuration for Brent's bracketed root finder.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BrentConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Absolute tolerance on the root.
    pub xtol: f64,
    /// Relative tolerance on the root.
    pub rtol: f64,
}

impl Default for BrentConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            xtol: 2e-12,
            rtol: 4.0 * f64::EPSILON,
        }
    }
}

/// Find a root of `f` in `[a, b]` using Brent's method.
///
/// Requires `f(a)` and `f(b)` to have opposite signs (or one of them to be
/// exactly zero). Combines bisection, secant and inverse quadratic
/// interpolation steps. Returns `None` when the bracket has no sign change,
/// when `f` produces a non-finite value, or when `max_iter` is exhausted.
pub(crate) fn brent_root<F>(f: F, a: f64, b: f64, config: &BrentConfig) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    let mut xpre = a;
    let mut xcur = b;
    let mut fpre = f(xpre);
    let mut fcur = f(xcur);

    if !fpre.is_finite() || !fcur.is_finite() {
        return None;
    }
    if fpre == 0.0 {
        return Some(xpre);
    }
    if fcur == 0.0 {
        return Some(xcur);
    }
    if fpre.signum() == fcur.signum() {
        return None;
    }

    let mut xblk = 0.0;
    let mut fblk = 0.0;
    let mut spre = 0.0;
    let mut scur = 0.0;

    for _ in 0..config.max_iter {
        if fpre != 0.0 && fcur != 0.0 && fpre.signum() != fcur.signum() {
            xblk = xpre;
            fblk = fpre;
            spre = xcur - xpre;
            scur = spre;
        }
        if fblk.abs() < fcur.abs() {
            xpre = xcur;
            xcur = xblk;
            xblk = xpre;

            fpre = fcur;
            fcur = fblk;
            fblk = fpre;
        }

        let delta = (config.xtol + config.rtol * xcur.abs()) / 2.0;
        let sbis = (xblk - xcur) / 2.0;
        if fcur == 0.0 || sbis.abs() < delta {
            return Some(xcur);
        }

        if spre.abs() > delta && fcur.abs() < fpre.abs() {
            let stry = if xpre == xblk {
                // Secant step
                -fcur * (xcur - xpre) / (fcur - fpre)
            } else {
                // Inverse quadratic interpolation
                let dpre = (fpre - fcur) / (xpre - xcur);
                let dblk = (fblk - fcur) / (xblk - xcur);
                -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
            };
            if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                spre = scur;
                scur = stry;
            } else {
                spre = sbis;
                scur = sbis;
            }
        } else {
            spre = sbis;
            scur = sbis;
        }

        xpre = xcur;
        fpre = fcur;
        if scur.abs() > delta {
            xcur += scur;
        } else {
            xcur += if sbis > 0.0 { delta } else { -delta };
        }
        fcur = f(xcur);
        if !fcur.is_finite() {
            return None;
        }
    }

    None
}
