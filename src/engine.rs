//! End-to-end surface construction.
//!
//! ```
//! use ivsurf::{OptionQuote, OptionType, SurfaceEngine};
//! use ivsurf::implied::bs_price;
//!
//! let spot = 100.0;
//! let mut quotes = Vec::new();
//! for &t in &[0.1, 0.25, 0.5] {
//!     for &k in &[90.0, 95.0, 100.0, 105.0, 110.0] {
//!         let price = bs_price(spot, k, t, 0.04, 0.25, OptionType::Call);
//!         quotes.push(OptionQuote::new(k, price - 0.01, price + 0.01, 10, OptionType::Call, t));
//!     }
//! }
//!
//! let engine = SurfaceEngine::builder().resolution(20).smoothing(0).build()?;
//! let surface = engine.build("XYZ", spot, &quotes)?;
//! assert_eq!(surface.grid.shape(), (20, 20));
//! assert!(surface.grid.is_complete());
//! # Ok::<(), ivsurf::IvSurfError>(())
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{self, IvSurfError};
use crate::implied::{BlackImpliedVol, SolverConfig};
use crate::quote::{OptionQuote, SolvedQuote};
use crate::surface::{
    AppliedMethod, ArbitrageDetector, ArbitragePolicy, ArbitrageSummary, ArbitrageViolation, CalibrationReport,
    DenseGrid, InterpolationMethod, SparseGrid, SurfacePoint, evaluate, interpolate, smooth,
};
use crate::validate::{validate_finite, validate_nonzero, validate_positive};

const DEFAULT_RATE: f64 = 0.04;
const DEFAULT_SMOOTHING: u32 = 50;
const DEFAULT_RESOLUTION: usize = 50;

/// Surface build settings.
///
/// Deserializes from a request body with any field omitted:
///
/// ```
/// use ivsurf::{SurfaceConfig, surface::InterpolationMethod};
///
/// let cfg: SurfaceConfig = serde_json::from_str(r#"{"interpolation": "Linear", "resolution": 30}"#).unwrap();
/// assert_eq!(cfg.interpolation, InterpolationMethod::Linear);
/// assert_eq!(cfg.resolution, 30);
/// assert_eq!(cfg.smoothing, 50);
/// assert_eq!(cfg.risk_free_rate, 0.04);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Interpolation method name.
    pub interpolation: InterpolationMethod,
    /// Smoothing level; Gaussian `σ = level / 100 × 2` cells, 0 disables.
    pub smoothing: u32,
    /// Points per dense axis.
    pub resolution: usize,
    /// Continuously compounded risk-free rate.
    pub risk_free_rate: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            interpolation: InterpolationMethod::default(),
            smoothing: DEFAULT_SMOOTHING,
            resolution: DEFAULT_RESOLUTION,
            risk_free_rate: DEFAULT_RATE,
        }
    }
}

impl SurfaceConfig {
    /// # Errors
    /// Returns [`IvSurfError::InvalidInput`] for a zero resolution or a
    /// non-finite rate.
    pub fn validate(&self) -> error::Result<()> {
        validate_nonzero(self.resolution, "resolution")?;
        validate_finite(self.risk_free_rate, "risk_free_rate")?;
        Ok(())
    }
}

/// Builds implied volatility surfaces from option chains.
///
/// Immutable once built; share it freely across threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceEngine {
    config: SurfaceConfig,
    solver: BlackImpliedVol,
    detector: ArbitrageDetector,
}

impl SurfaceEngine {
    /// Engine with validated `config` and default solver and arbitrage policy.
    pub fn new(config: SurfaceConfig) -> error::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Start a [`SurfaceEngineBuilder`] from the defaults.
    pub fn builder() -> SurfaceEngineBuilder {
        SurfaceEngineBuilder::new()
    }

    /// Settings this engine builds with.
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Run the full pipeline for one ticker.
    ///
    /// Quotes the solver cannot invert are dropped. The returned grid spans
    /// the observed strike and maturity ranges and has no undefined cells.
    ///
    /// # Errors
    /// - [`IvSurfError::InvalidInput`] if `spot` is not positive and finite
    /// - [`IvSurfError::EmptySurface`] if no quote yields an implied vol
    pub fn build(&self, ticker: &str, spot: f64, quotes: &[OptionQuote]) -> error::Result<SurfaceOutput> {
        validate_positive(spot, "spot")?;
        let cfg = &self.config;

        #[cfg(feature = "logging")]
        tracing::debug!(
            ticker,
            n_quotes = quotes.len(),
            method = %cfg.interpolation,
            resolution = cfg.resolution,
            smoothing = cfg.smoothing,
            "surface build started"
        );

        let solved = self.solver.solve_chain(spot, cfg.risk_free_rate, quotes);
        if solved.is_empty() {
            return Err(IvSurfError::EmptySurface {
                message: format!("none of {} quotes for {ticker} produced an implied vol", quotes.len()),
            });
        }

        let sparse = SparseGrid::build(&solved);
        let interpolated = interpolate(&sparse, &cfg.interpolation, cfg.resolution)?;
        let grid = smooth(&interpolated.grid, cfg.smoothing);
        let violations = self.detector.detect_grid(&grid);
        let calibration = evaluate(&grid, &solved);

        #[cfg(feature = "logging")]
        tracing::debug!(
            ticker,
            n_solved = solved.len(),
            n_points = sparse.len(),
            applied = ?interpolated.applied,
            n_violations = violations.len(),
            rmse = calibration.rmse,
            "surface build complete"
        );

        let (strikes, maturities) = (grid.strikes().to_vec(), grid.maturities().to_vec());
        Ok(SurfaceOutput {
            strikes,
            maturities,
            grid,
            points: sparse.points(),
            violations,
            calibration,
            meta: SurfaceMeta {
                ticker: ticker.to_string(),
                interpolation_method: cfg.interpolation.clone(),
                smoothing_level: cfg.smoothing,
                resolution: cfg.resolution,
                generated_at: Utc::now(),
            },
            applied_method: interpolated.applied,
            solved,
        })
    }
}

/// Chained construction of a [`SurfaceEngine`].
///
/// ```
/// use ivsurf::SurfaceEngine;
/// use ivsurf::surface::{ArbitragePolicy, InterpolationMethod};
///
/// let engine = SurfaceEngine::builder()
///     .rate(0.05)
///     .method(InterpolationMethod::Kriging)
///     .smoothing(20)
///     .resolution(40)
///     .policy(ArbitragePolicy { butterfly_tolerance: 0.05, ..Default::default() })
///     .build()?;
/// assert_eq!(engine.config().resolution, 40);
/// # Ok::<(), ivsurf::IvSurfError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SurfaceEngineBuilder {
    config: SurfaceConfig,
    solver: SolverConfig,
    policy: ArbitragePolicy,
}

impl SurfaceEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing config.
    pub fn config(mut self, config: SurfaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Risk-free rate. Default 0.04.
    pub fn rate(mut self, rate: f64) -> Self {
        self.config.risk_free_rate = rate;
        self
    }

    /// Interpolation method. Default [`InterpolationMethod::Cubic`].
    pub fn method(mut self, method: InterpolationMethod) -> Self {
        self.config.interpolation = method;
        self
    }

    /// Smoothing level; 0 disables. Default 50.
    pub fn smoothing(mut self, level: u32) -> Self {
        self.config.smoothing = level;
        self
    }

    /// Points per dense axis. Default 50.
    pub fn resolution(mut self, resolution: usize) -> Self {
        self.config.resolution = resolution;
        self
    }

    /// Arbitrage thresholds. Default [`ArbitragePolicy::default`].
    pub fn policy(mut self, policy: ArbitragePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Implied vol bracket and tolerances. Default [`SolverConfig::default`].
    pub fn solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// # Errors
    /// Returns [`IvSurfError::InvalidInput`] if the config or solver
    /// bracket is invalid.
    pub fn build(self) -> error::Result<SurfaceEngine> {
        self.config.validate()?;
        validate_positive(self.solver.vol_lower, "vol_lower")?;
        validate_positive(self.solver.vol_upper, "vol_upper")?;
        if self.solver.vol_lower >= self.solver.vol_upper {
            return Err(IvSurfError::InvalidInput {
                message: format!(
                    "solver bracket [{}, {}] is empty",
                    self.solver.vol_lower, self.solver.vol_upper
                ),
            });
        }
        validate_finite(self.policy.butterfly_tolerance, "butterfly_tolerance")?;
        validate_finite(self.policy.calendar_high_ratio, "calendar_high_ratio")?;
        Ok(SurfaceEngine {
            config: self.config,
            solver: BlackImpliedVol::new(self.solver),
            detector: ArbitrageDetector::new(self.policy),
        })
    }
}

/// Provenance of a built surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMeta {
    /// Underlying symbol as passed to [`SurfaceEngine::build`].
    pub ticker: String,
    /// Method requested; see [`SurfaceOutput::applied_method`] for the one used.
    pub interpolation_method: InterpolationMethod,
    /// Smoothing level applied.
    pub smoothing_level: u32,
    /// Points per dense axis.
    pub resolution: usize,
    /// Build time, UTC.
    pub generated_at: DateTime<Utc>,
}

/// Everything produced by one [`SurfaceEngine::build`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceOutput {
    /// Dense strike axis.
    pub strikes: Vec<f64>,
    /// Dense maturity axis, years.
    pub maturities: Vec<f64>,
    /// Smoothed dense vols. Serialized as the bare `[strike][maturity]`
    /// matrix; the axes are `strikes` and `maturities`.
    #[serde(serialize_with = "serialize_values")]
    pub grid: DenseGrid,
    /// Observed sparse points, strike-major.
    pub points: Vec<SurfacePoint>,
    /// Arbitrage found on the smoothed grid.
    pub violations: Vec<ArbitrageViolation>,
    /// Fit of the smoothed grid to the solved quotes.
    pub calibration: CalibrationReport,
    pub meta: SurfaceMeta,
    /// Interpolator that produced the grid after any fallback.
    pub applied_method: AppliedMethod,
    /// Quotes that produced an implied vol.
    #[serde(skip)]
    pub solved: Vec<SolvedQuote>,
}

fn serialize_values<S: Serializer>(grid: &DenseGrid, serializer: S) -> Result<S::Ok, S::Error> {
    grid.values().serialize(serializer)
}

/// Compact summary of a built surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceAnalysis {
    /// No violation of either kind.
    pub arbitrage_clean: bool,
    pub calibration: CalibrationReport,
    /// Number of observed `(strike, maturity)` points.
    pub data_points: usize,
}

impl SurfaceOutput {
    /// Arbitrage verdict, calibration and data count in one record.
    pub fn analysis(&self) -> SurfaceAnalysis {
        SurfaceAnalysis {
            arbitrage_clean: ArbitrageSummary::from_violations(&self.violations).is_free(),
            calibration: self.calibration,
            data_points: self.points.len(),
        }
    }

    /// Violation counts by kind and severity.
    pub fn arbitrage_summary(&self) -> ArbitrageSummary {
        ArbitrageSummary::from_violations(&self.violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implied::bs_price;
    use crate::types::OptionType;
    use approx::assert_abs_diff_eq;

    const SPOT: f64 = 100.0;

    fn chain(vol: impl Fn(f64, f64) -> f64) -> Vec<OptionQuote> {
        let mut quotes = Vec::new();
        for &t in &[0.1, 0.25, 0.5, 1.0] {
            for &k in &[85.0, 90.0, 95.0, 100.0, 105.0, 110.0, 115.0] {
                let ty = if k < SPOT { OptionType::Put } else { OptionType::Call };
                let p = bs_price(SPOT, k, t, DEFAULT_RATE, vol(k, t), ty);
                quotes.push(OptionQuote::new(k, p * 0.999, p * 1.001, 5, ty, t));
            }
        }
        quotes
    }

    fn smile(k: f64, _t: f64) -> f64 {
        let m = (k / SPOT).ln();
        0.2 + 0.4 * m * m
    }

    #[test]
    fn config_defaults() {
        let cfg = SurfaceConfig::default();
        assert_eq!(cfg.interpolation, InterpolationMethod::Cubic);
        assert_eq!(cfg.smoothing, 50);
        assert_eq!(cfg.resolution, 50);
        assert_eq!(cfg.risk_free_rate, 0.04);
        let parsed: SurfaceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(SurfaceEngine::builder().resolution(0).build().is_err());
        assert!(SurfaceEngine::builder().rate(f64::NAN).build().is_err());
        let bad_bracket = SolverConfig {
            vol_lower: 2.0,
            vol_upper: 1.0,
            ..SolverConfig::default()
        };
        assert!(SurfaceEngine::builder().solver(bad_bracket).build().is_err());
        assert!(SurfaceEngine::new(SurfaceConfig {
            resolution: 0,
            ..SurfaceConfig::default()
        })
        .is_err());
    }

    #[test]
    fn build_recovers_flat_surface() {
        let engine = SurfaceEngine::builder().resolution(15).build().unwrap();
        let out = engine.build("FLAT", SPOT, &chain(|_, _| 0.3)).unwrap();
        assert_eq!(out.grid.shape(), (15, 15));
        assert_eq!(out.strikes, out.grid.strikes());
        assert_eq!(out.maturities, out.grid.maturities());
        for v in out.grid.values().iter().flatten() {
            assert_abs_diff_eq!(*v, 0.3, epsilon = 1e-4);
        }
        assert!(out.violations.is_empty());
        assert!(out.analysis().arbitrage_clean);
        assert_eq!(out.points.len(), 28);
        assert_eq!(out.meta.ticker, "FLAT");
        assert_eq!(out.applied_method, AppliedMethod::Cubic);
    }

    #[test]
    fn build_fits_smile_closely() {
        let engine = SurfaceEngine::builder().resolution(31).smoothing(0).build().unwrap();
        let out = engine.build("SMILE", SPOT, &chain(smile)).unwrap();
        assert_eq!(out.calibration.n_points, 28);
        assert!(out.calibration.rmse < 5e-3, "rmse {}", out.calibration.rmse);
        assert!(out.calibration.r_squared > 0.9);
        assert_eq!(out.analysis().data_points, 28);
    }

    #[test]
    fn spot_must_be_positive() {
        let engine = SurfaceEngine::default();
        let err = engine.build("X", 0.0, &chain(smile)).unwrap_err();
        assert!(matches!(err, IvSurfError::InvalidInput { .. }));
    }

    #[test]
    fn no_quotes_is_empty_surface() {
        let err = SurfaceEngine::default().build("X", SPOT, &[]).unwrap_err();
        assert!(matches!(err, IvSurfError::EmptySurface { .. }));
    }

    #[test]
    fn unsolvable_quotes_are_empty_surface() {
        // Call priced above spot admits no vol.
        let q = OptionQuote::new(100.0, 150.0, 151.0, 1, OptionType::Call, 0.5);
        let err = SurfaceEngine::default().build("X", SPOT, &[q]).unwrap_err();
        assert!(matches!(err, IvSurfError::EmptySurface { .. }));
    }

    #[test]
    fn smoothing_above_one_hundred_builds() {
        let engine = SurfaceEngine::builder().smoothing(150).resolution(12).build().unwrap();
        assert_eq!(engine.config().smoothing, 150);
        let out = engine.build("WIDE", SPOT, &chain(smile)).unwrap();
        assert_eq!(out.meta.smoothing_level, 150);
        assert!(out.grid.is_complete());
        let light = SurfaceEngine::builder().smoothing(100).resolution(12).build().unwrap();
        assert_ne!(out.grid, light.build("WIDE", SPOT, &chain(smile)).unwrap().grid);
    }

    #[test]
    fn output_grid_serializes_as_value_matrix() {
        let engine = SurfaceEngine::builder().resolution(6).build().unwrap();
        let out = engine.build("JSON", SPOT, &chain(smile)).unwrap();
        let json = serde_json::to_value(&out).unwrap();
        let rows = json["grid"].as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].as_array().unwrap().len(), 6);
        assert_eq!(json["strikes"].as_array().unwrap().len(), 6);
        assert!(json["grid"].get("strikes").is_none());
    }

    #[test]
    fn meta_records_request() {
        let engine = SurfaceEngine::builder()
            .method(InterpolationMethod::Nearest)
            .smoothing(10)
            .resolution(8)
            .build()
            .unwrap();
        let before = Utc::now();
        let out = engine.build("META", SPOT, &chain(smile)).unwrap();
        assert_eq!(out.meta.interpolation_method, InterpolationMethod::Nearest);
        assert_eq!(out.meta.smoothing_level, 10);
        assert_eq!(out.meta.resolution, 8);
        assert!(out.meta.generated_at >= before);
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SurfaceEngine>();
        assert_send_sync::<SurfaceOutput>();
    }
}
