//! Option quotes as consumed and produced by the engine.
//!
//! An [`OptionQuote`] is a cleaned market quote handed over by the data
//! layer. Once the implied volatility solver has inverted its mid price it
//! becomes a [`SolvedQuote`]; quotes that cannot be solved never get one.

use serde::{Deserialize, Serialize};

use crate::error::IvSurfError;
use crate::types::{OptionType, Vol};

/// A single cleaned option quote.
///
/// `mid` is always `(bid + ask) / 2`. When deserializing, `mid` (or its
/// alias `mid_price`) may be omitted and is then recomputed, and
/// `option_type` is accepted in any letter case.
///
/// # Examples
/// ```
/// use ivsurf::quote::OptionQuote;
/// use ivsurf::types::OptionType;
///
/// let q = OptionQuote::new(100.0, 4.9, 5.1, 250, OptionType::Call, 0.25);
/// assert!((q.mid - 5.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuoteRecord")]
pub struct OptionQuote {
    /// Strike price `K`.
    pub strike: f64,
    /// Best bid.
    pub bid: f64,
    /// Best ask.
    pub ask: f64,
    /// Mid price `(bid + ask) / 2`.
    pub mid: f64,
    /// Traded volume.
    pub volume: u64,
    /// Call or put.
    pub option_type: OptionType,
    /// Time to maturity in years (365.25-day convention).
    pub time_to_maturity: f64,
}

impl OptionQuote {
    /// Create a quote, computing the mid price from bid and ask.
    pub fn new(
        strike: f64,
        bid: f64,
        ask: f64,
        volume: u64,
        option_type: OptionType,
        time_to_maturity: f64,
    ) -> Self {
        Self {
            strike,
            bid,
            ask,
            mid: (bid + ask) / 2.0,
            volume,
            option_type,
            time_to_maturity,
        }
    }

    /// Whether the quote is usable for implied volatility extraction:
    /// traded, two-sided, not crossed, positive mid, positive strike and
    /// maturity.
    pub fn is_tradeable(&self) -> bool {
        self.volume > 0
            && self.bid > 0.0
            && self.ask > 0.0
            && self.ask >= self.bid
            && self.mid > 0.0
            && self.strike > 0.0
            && self.time_to_maturity > 0.0
            && self.strike.is_finite()
            && self.mid.is_finite()
            && self.time_to_maturity.is_finite()
    }
}

/// Wire form of [`OptionQuote`].
#[derive(Deserialize)]
struct QuoteRecord {
    strike: f64,
    bid: f64,
    ask: f64,
    #[serde(default, alias = "mid_price")]
    mid: Option<f64>,
    #[serde(default)]
    volume: u64,
    option_type: String,
    time_to_maturity: f64,
}

impl TryFrom<QuoteRecord> for OptionQuote {
    type Error = IvSurfError;

    fn try_from(r: QuoteRecord) -> Result<Self, Self::Error> {
        let option_type = r.option_type.parse()?;
        let mut quote = OptionQuote::new(
            r.strike,
            r.bid,
            r.ask,
            r.volume,
            option_type,
            r.time_to_maturity,
        );
        if let Some(mid) = r.mid {
            quote.mid = mid;
        }
        Ok(quote)
    }
}

/// Keep only quotes that pass [`OptionQuote::is_tradeable`].
pub fn retain_tradeable(quotes: &mut Vec<OptionQuote>) {
    quotes.retain(OptionQuote::is_tradeable);
}

/// A quote whose implied volatility has been solved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolvedQuote {
    /// Strike price `K`.
    pub strike: f64,
    /// Time to maturity in years.
    pub time_to_maturity: f64,
    /// Call or put.
    pub option_type: OptionType,
    /// Mid price the volatility was inverted from.
    pub market_price: f64,
    /// Black-Scholes implied volatility.
    pub implied_vol: Vol,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_is_average_of_bid_and_ask() {
        let q = OptionQuote::new(90.0, 10.0, 12.0, 1, OptionType::Put, 0.5);
        assert_eq!(q.mid, 11.0);
    }

    #[test]
    fn retain_tradeable_filters_bad_quotes() {
        let mut quotes = vec![
            OptionQuote::new(100.0, 4.9, 5.1, 10, OptionType::Call, 0.25),
            OptionQuote::new(100.0, 4.9, 5.1, 0, OptionType::Call, 0.25),
            OptionQuote::new(100.0, 0.0, 5.1, 10, OptionType::Call, 0.25),
            OptionQuote::new(100.0, 5.2, 5.1, 10, OptionType::Call, 0.25),
            OptionQuote::new(100.0, 4.9, 5.1, 10, OptionType::Call, 0.0),
            OptionQuote::new(-1.0, 4.9, 5.1, 10, OptionType::Call, 0.25),
        ];
        retain_tradeable(&mut quotes);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].volume, 10);
    }

    #[test]
    fn deserialize_recomputes_missing_mid_and_normalizes_type() {
        let json = r#"{"strike":100.0,"bid":1.0,"ask":3.0,"volume":5,
                       "option_type":"CALL","time_to_maturity":0.1}"#;
        let q: OptionQuote = serde_json::from_str(json).unwrap();
        assert_eq!(q.mid, 2.0);
        assert_eq!(q.option_type, OptionType::Call);
    }

    #[test]
    fn deserialize_accepts_mid_price_alias() {
        let json = r#"{"strike":100.0,"bid":1.0,"ask":3.0,"mid_price":2.1,
                       "option_type":"put","time_to_maturity":0.1}"#;
        let q: OptionQuote = serde_json::from_str(json).unwrap();
        assert_eq!(q.mid, 2.1);
        assert_eq!(q.volume, 0);
    }

    #[test]
    fn deserialize_rejects_unknown_option_type() {
        let json = r#"{"strike":100.0,"bid":1.0,"ask":3.0,
                       "option_type":"future","time_to_maturity":0.1}"#;
        assert!(serde_json::from_str::<OptionQuote>(json).is_err());
    }
}
