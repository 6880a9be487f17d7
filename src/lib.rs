//! # ivsurf
//!
//! Implied volatility surface construction from listed option chains.
//!
//! Provides the full pipeline: option quotes → Black-Scholes implied vol
//! extraction → sparse `(strike, maturity)` grid → dense interpolated
//! surface → Gaussian smoothing → arbitrage and calibration diagnostics.
//!
//! ## Architecture
//!
//! - **`implied`**: Black-Scholes pricing and Brent-based vol inversion
//! - **`quote`**: Market quotes and their solved counterparts
//! - **`surface`**: Sparse and dense grids, interpolation, smoothing,
//!   arbitrage detection, calibration metrics
//! - **`engine`**: [`SurfaceEngine`] running the pipeline end to end
//! - **`cache`**: [`SurfaceCache`], a per-ticker TTL cache for built surfaces
//!
//! ## Design
//!
//! - **Unsolvable quotes are dropped, not errors.** Only configuration
//!   mistakes and an empty result surface as [`IvSurfError`].
//! - **Interpolation always completes.** Each method falls back along a
//!   fixed chain ending in an identity snap, and residual gaps are filled
//!   with the mean observed vol. The method actually used is reported.
//! - **No panics.** Library code never calls `unwrap()` or `expect()`.
//! - **Stateless engine.** [`SurfaceEngine`] is an immutable config holder
//!   and is `Send + Sync`.
//! - **Serializable.** Outputs implement Serde `Serialize`.

pub mod cache;
pub mod conventions;
pub mod engine;
pub mod error;
pub mod implied;
mod optim;
pub mod quote;
pub mod surface;
pub mod types;
mod validate;

#[doc(inline)]
pub use cache::SurfaceCache;
#[doc(inline)]
pub use engine::{SurfaceAnalysis, SurfaceConfig, SurfaceEngine, SurfaceEngineBuilder, SurfaceMeta, SurfaceOutput};
#[doc(inline)]
pub use error::{IvSurfError, Result};
#[doc(inline)]
pub use quote::{OptionQuote, SolvedQuote};
#[doc(inline)]
pub use types::{OptionType, Variance, Vol};
