//! Implied volatility extraction from option prices.
//!
//! - [`bs_price`]: Black-Scholes closed form, the inversion objective
//! - [`BlackImpliedVol`]: bracketed inversion of a price to a volatility

pub mod black;

pub use black::{BlackImpliedVol, MIN_IMPLIED_VOL, SolverConfig, bs_price, bs_vega};
