//! Core domain types for implied volatility surface construction.
//!
//! **Outputs use newtypes**: [`Vol`] and [`Variance`] wrap solver and
//! detector results so a volatility is never mistaken for a total variance.
//! **Inputs use bare `f64`**: strikes and maturities are passed as raw
//! floats and named by parameter.
//!
//! These types wrap `f64`, so only `PartialEq`/`PartialOrd` are derived.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IvSurfError;

/// Implied volatility `σ`, measured as annualized standard deviation.
///
/// # Examples
/// ```
/// use ivsurf::types::Vol;
/// let vol = Vol(0.20);
/// assert_eq!(vol.0, 0.20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Vol(pub f64);

/// Total variance `σ²T`.
///
/// Calendar arbitrage is checked in total-variance space: `σ²T` must be
/// non-decreasing in `T` at every strike.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Variance(pub f64);

impl Vol {
    /// Total variance `σ²T` at the given maturity.
    pub fn total_variance(self, maturity: f64) -> Variance {
        Variance(self.0 * self.0 * maturity)
    }
}

/// Option type: call or put.
///
/// Parsed case-insensitively, so `"CALL"`, `"call"` and `"Call"` are all
/// accepted; serialized as lowercase.
///
/// # Examples
/// ```
/// use ivsurf::types::OptionType;
/// let t: OptionType = "PUT".parse().unwrap();
/// assert_eq!(t, OptionType::Put);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Right to buy at strike price.
    Call,
    /// Right to sell at strike price.
    Put,
}

impl OptionType {
    /// Lowercase name, as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = IvSurfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            other => Err(IvSurfError::InvalidInput {
                message: format!("unknown option type {other:?}, expected call or put"),
            }),
        }
    }
}
