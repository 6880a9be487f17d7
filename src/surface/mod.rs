//! Volatility surface construction and diagnostics.
//!
//! A surface is built in stages, each in its own module:
//!
//! - [`SparseGrid`] groups solved quotes by `(strike, maturity)`
//! - [`interpolate`] fills a [`DenseGrid`] over evenly spaced axes, with a
//!   fallback chain ending in an identity snap
//! - [`smooth`] applies a separable Gaussian filter
//! - [`ArbitrageDetector`] scans for calendar and butterfly violations
//! - [`evaluate`] measures fit against the market quotes

pub mod arbitrage;
pub mod calibration;
pub mod dense;
pub mod grid;
pub mod interp;
pub mod smooth;

pub use arbitrage::{
    ArbitrageDetector, ArbitragePolicy, ArbitrageSummary, ArbitrageViolation, Severity, ViolationKind,
    ViolationLocation,
};
pub use calibration::{CalibrationReport, evaluate};
pub use dense::{DenseGrid, SliceKind, VolSlice, linspace};
pub use grid::{SparseGrid, SurfacePoint};
pub use interp::{AppliedMethod, InterpolationMethod, Interpolated, interpolate};
pub use smooth::{sigma_for_level, smooth};
