//! Black-Scholes pricing and implied volatility inversion.
//!
//! # Formula
//! ```text
//! d1 = (ln(S/K) + (r + σ²/2)·T) / (σ√T),   d2 = d1 − σ√T
//! C  = S·Φ(d1) − K·e^{−rT}·Φ(d2)
//! P  = K·e^{−rT}·Φ(−d2) − S·Φ(−d1)
//! ```
//!
//! The inversion brackets σ in `[1e-5, 5.0]` and runs Brent's method on
//! `price(σ) − market_price`. Black-Scholes prices are strictly increasing
//! in σ for `T > 0`, so a sign change across the bracket guarantees a
//! unique root.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use statrs::function::erf::erfc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::optim::{BrentConfig, brent_root};
use crate::quote::{OptionQuote, SolvedQuote};
use crate::types::{OptionType, Vol};

/// Standard normal cumulative distribution function Φ(x).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x * FRAC_1_SQRT_2)
}

fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes price of a European option on a non-dividend-paying spot.
///
/// For `maturity <= 0` the intrinsic value is returned with no volatility
/// or discounting term. Callers must supply `spot`, `strike` and `vol`
/// strictly positive when `maturity > 0`.
///
/// # Examples
/// ```
/// use ivsurf::implied::bs_price;
/// use ivsurf::types::OptionType;
///
/// assert_eq!(bs_price(100.0, 90.0, 0.0, 0.04, 0.2, OptionType::Call), 10.0);
/// let atm = bs_price(100.0, 100.0, 1.0, 0.0, 0.2, OptionType::Call);
/// assert!((atm - 7.965567455405804).abs() < 1e-9);
/// ```
pub fn bs_price(
    spot: f64,
    strike: f64,
    maturity: f64,
    rate: f64,
    vol: f64,
    option_type: OptionType,
) -> f64 {
    if maturity <= 0.0 {
        return match option_type {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        };
    }
    let sqrt_t = maturity.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * maturity) / (vol * sqrt_t);
    let d2 = d1 - vol * sqrt_t;
    let discount = (-rate * maturity).exp();
    match option_type {
        OptionType::Call => spot * norm_cdf(d1) - strike * discount * norm_cdf(d2),
        OptionType::Put => strike * discount * norm_cdf(-d2) - spot * norm_cdf(-d1),
    }
}

/// Black-Scholes vega ∂V/∂σ (identical for calls and puts).
///
/// Returns 0 for `maturity <= 0`.
pub fn bs_vega(spot: f64, strike: f64, maturity: f64, rate: f64, vol: f64) -> f64 {
    if maturity <= 0.0 {
        return 0.0;
    }
    let sqrt_t = maturity.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * maturity) / (vol * sqrt_t);
    spot * norm_pdf(d1) * sqrt_t
}

/// Tuning knobs for implied volatility extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Lower end of the volatility bracket.
    pub vol_lower: f64,
    /// Upper end of the volatility bracket.
    pub vol_upper: f64,
    /// Root-finder iteration cap.
    pub max_iter: usize,
    /// Solved vols at or below this level are discarded by
    /// [`BlackImpliedVol::solve_chain`].
    pub min_vol: f64,
}

/// Solved vols at or below this level are numerically meaningless.
pub const MIN_IMPLIED_VOL: f64 = 0.001;

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            vol_lower: 1e-5,
            vol_upper: 5.0,
            max_iter: 100,
            min_vol: MIN_IMPLIED_VOL,
        }
    }
}

/// Black-Scholes implied volatility calculator.
///
/// # Examples
/// ```
/// use ivsurf::implied::{bs_price, BlackImpliedVol};
/// use ivsurf::types::OptionType;
///
/// let price = bs_price(100.0, 110.0, 0.5, 0.04, 0.27, OptionType::Put);
/// let vol = BlackImpliedVol::default()
///     .solve(price, 100.0, 110.0, 0.5, 0.04, OptionType::Put)
///     .unwrap();
/// assert!((vol.0 - 0.27).abs() < 1e-8);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlackImpliedVol {
    config: SolverConfig,
}

impl BlackImpliedVol {
    /// Create a solver with explicit settings.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Active solver settings.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Invert a market price to a Black-Scholes implied volatility.
    ///
    /// Returns `None` when the inversion is ill-posed (`maturity`, `spot`,
    /// `strike` or `market_price` non-positive or non-finite), when the
    /// bracket does not straddle the market price, or when the iteration
    /// cap is reached.
    pub fn solve(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        option_type: OptionType,
    ) -> Option<Vol> {
        let well_posed = [market_price, spot, strike, maturity]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
            && rate.is_finite();
        if !well_posed {
            return None;
        }

        let objective =
            |vol: f64| bs_price(spot, strike, maturity, rate, vol, option_type) - market_price;
        let brent = BrentConfig {
            max_iter: self.config.max_iter,
            ..BrentConfig::default()
        };
        brent_root(objective, self.config.vol_lower, self.config.vol_upper, &brent).map(Vol)
    }

    /// Solve every quote of a chain against one spot and rate.
    ///
    /// Quotes that cannot be solved, or whose vol is at or below
    /// [`SolverConfig::min_vol`], are dropped. Input order is preserved.
    pub fn solve_chain(&self, spot: f64, rate: f64, quotes: &[OptionQuote]) -> Vec<SolvedQuote> {
        let solve_one = |q: &OptionQuote| -> Option<SolvedQuote> {
            let vol = self.solve(q.mid, spot, q.strike, q.time_to_maturity, rate, q.option_type)?;
            (vol.0 > self.config.min_vol).then_some(SolvedQuote {
                strike: q.strike,
                time_to_maturity: q.time_to_maturity,
                option_type: q.option_type,
                market_price: q.mid,
                implied_vol: vol,
            })
        };

        #[cfg(feature = "parallel")]
        let solved: Vec<SolvedQuote> = quotes.par_iter().filter_map(solve_one).collect();
        #[cfg(not(feature = "parallel"))]
        let solved: Vec<SolvedQuote> = quotes.iter().filter_map(solve_one).collect();

        #[cfg(feature = "logging")]
        tracing::debug!(
            n_quotes = quotes.len(),
            n_solved = solved.len(),
            n_dropped = quotes.len() - solved.len(),
            "implied vol extraction complete"
        );

        solved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn norm_cdf_reference_values() {
        assert_abs_diff_eq!(norm_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(norm_cdf(1.96), 0.975_002_104_851_780, epsilon = 1e-12);
        assert_abs_diff_eq!(norm_cdf(-1.0), 0.158_655_253_931_457, epsilon = 1e-12);
    }

    #[test]
    fn expired_option_is_intrinsic() {
        assert_eq!(bs_price(100.0, 90.0, 0.0, 0.04, 0.2, OptionType::Call), 10.0);
        assert_eq!(bs_price(100.0, 90.0, 0.0, 0.04, 0.2, OptionType::Put), 0.0);
        assert_eq!(bs_price(100.0, 110.0, -1.0, 0.04, 0.2, OptionType::Put), 10.0);
        assert_eq!(bs_price(100.0, 110.0, 0.0, 0.04, 0.2, OptionType::Call), 0.0);
    }

    #[test]
    fn put_call_parity_holds() {
        let (s, k, t, r, v) = (100.0, 95.0, 0.75, 0.03, 0.25);
        let c = bs_price(s, k, t, r, v, OptionType::Call);
        let p = bs_price(s, k, t, r, v, OptionType::Put);
        assert_abs_diff_eq!(c - p, s - k * (-r * t).exp(), epsilon = 1e-10);
    }

    #[test]
    fn call_price_increases_with_vol() {
        let mut prev = 0.0;
        for i in 1..=200 {
            let vol = i as f64 * 0.01;
            let price = bs_price(100.0, 105.0, 0.5, 0.04, vol, OptionType::Call);
            assert!(price > prev, "price not increasing at vol {vol}");
            prev = price;
        }
    }

    #[test]
    fn vega_matches_finite_difference() {
        let (s, k, t, r, v) = (100.0, 100.0, 1.0, 0.02, 0.3);
        let h = 1e-5;
        let fd = (bs_price(s, k, t, r, v + h, OptionType::Call)
            - bs_price(s, k, t, r, v - h, OptionType::Call))
            / (2.0 * h);
        assert_abs_diff_eq!(bs_vega(s, k, t, r, v), fd, epsilon = 1e-6);
        assert_eq!(bs_vega(s, k, 0.0, r, v), 0.0);
    }

    #[test]
    fn solver_round_trips_calls_and_puts() {
        let solver = BlackImpliedVol::default();
        for &vol in &[0.15, 0.4, 0.9, 1.5] {
            for &k in &[90.0, 100.0, 115.0] {
                for option_type in [OptionType::Call, OptionType::Put] {
                    let price = bs_price(100.0, k, 0.5, 0.04, vol, option_type);
                    let solved = solver.solve(price, 100.0, k, 0.5, 0.04, option_type).unwrap();
                    assert_abs_diff_eq!(solved.0, vol, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn solver_rejects_ill_posed_inputs() {
        let solver = BlackImpliedVol::default();
        assert!(solver.solve(5.0, 100.0, 100.0, 0.0, 0.04, OptionType::Call).is_none());
        assert!(solver.solve(5.0, 0.0, 100.0, 0.5, 0.04, OptionType::Call).is_none());
        assert!(solver.solve(5.0, 100.0, -1.0, 0.5, 0.04, OptionType::Call).is_none());
        assert!(solver.solve(0.0, 100.0, 100.0, 0.5, 0.04, OptionType::Call).is_none());
        assert!(solver.solve(f64::NAN, 100.0, 100.0, 0.5, 0.04, OptionType::Call).is_none());
    }

    #[test]
    fn price_below_intrinsic_is_not_found() {
        // Deep ITM call priced under its discounted intrinsic value: no σ matches.
        let solver = BlackImpliedVol::default();
        assert!(solver.solve(15.0, 100.0, 80.0, 0.5, 0.04, OptionType::Call).is_none());
    }

    #[test]
    fn price_above_spot_is_not_found() {
        let solver = BlackImpliedVol::default();
        assert!(solver.solve(150.0, 100.0, 100.0, 0.5, 0.04, OptionType::Call).is_none());
    }

    #[test]
    fn solve_chain_drops_unsolvable_and_low_vols() {
        let high = bs_price(100.0, 100.0, 0.25, 0.04, 0.3, OptionType::Call);
        let low = bs_price(100.0, 110.0, 0.25, 0.04, 0.2, OptionType::Call);
        let quotes = vec![
            OptionQuote::new(100.0, high, high, 10, OptionType::Call, 0.25),
            OptionQuote::new(100.0, 150.0, 150.0, 10, OptionType::Call, 0.25),
            OptionQuote::new(110.0, low, low, 10, OptionType::Call, 0.25),
            OptionQuote::new(100.0, high, high, 10, OptionType::Call, 0.0),
        ];
        let solver = BlackImpliedVol::new(SolverConfig {
            min_vol: 0.25,
            ..SolverConfig::default()
        });
        let solved = solver.solve_chain(100.0, 0.04, &quotes);
        assert_eq!(solved.len(), 1);
        assert_abs_diff_eq!(solved[0].implied_vol.0, 0.3, epsilon = 1e-6);
        assert_eq!(solved[0].market_price, high);

        let default_solved = BlackImpliedVol::default().solve_chain(100.0, 0.04, &quotes);
        assert_eq!(default_solved.len(), 2);
        assert_eq!(default_solved[1].strike, 110.0);
    }

    #[test]
    fn custom_bracket_excludes_high_vols() {
        let solver = BlackImpliedVol::new(SolverConfig {
            vol_upper: 0.5,
            ..SolverConfig::default()
        });
        let price = bs_price(100.0, 100.0, 1.0, 0.0, 0.8, OptionType::Call);
        assert!(solver.solve(price, 100.0, 100.0, 1.0, 0.0, OptionType::Call).is_none());
        assert_eq!(solver.config().vol_upper, 0.5);
    }
}
