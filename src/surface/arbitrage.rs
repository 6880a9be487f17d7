//! Grid-level arbitrage diagnostics.
//!
//! Two static-arbitrage conditions are scanned on a dense vol grid:
//!
//! - **Calendar**: total variance `σ²t` must not decrease with maturity at a
//!   fixed strike.
//! - **Butterfly**: variance must be roughly convex in strike at a fixed
//!   maturity; an interior `σ²` may not exceed the neighbours' midpoint by
//!   more than a relative tolerance.
//!
//! Violations are reported, never corrected.
//!
//! # References
//! - Gatheral, J. & Jacquier, A. "Arbitrage-free SVI volatility surfaces" (2014)

use serde::{Deserialize, Serialize};

use crate::surface::dense::DenseGrid;
use crate::types::Vol;

/// Thresholds used by [`ArbitrageDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArbitragePolicy {
    /// Relative excess of the centre variance over the neighbours' midpoint
    /// tolerated before a butterfly violation is reported.
    pub butterfly_tolerance: f64,
    /// Short/long total variance ratio above which a calendar violation is
    /// [`Severity::High`].
    pub calendar_high_ratio: f64,
}

impl Default for ArbitragePolicy {
    fn default() -> Self {
        Self {
            butterfly_tolerance: 0.10,
            calendar_high_ratio: 1.2,
        }
    }
}

/// Which no-arbitrage condition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    /// Total variance decreased with maturity.
    Calendar,
    /// Variance not convex enough in strike.
    Butterfly,
}

/// Violation severity; `High` orders above `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

/// Where a violation sits on the grid, with the variances compared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViolationLocation {
    Calendar {
        strike: f64,
        maturity_short: f64,
        maturity_long: f64,
        /// `σ²t` at the shorter maturity.
        variance_short: f64,
        /// `σ²t` at the longer maturity.
        variance_long: f64,
    },
    Butterfly {
        maturity: f64,
        /// Left, centre and right strikes.
        strikes: [f64; 3],
        /// `σ²` at the centre strike.
        center_variance: f64,
        /// `(σ²_left + σ²_right) / 2`.
        midpoint_variance: f64,
    },
}

/// A single detected violation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageViolation {
    /// Condition that failed.
    pub kind: ViolationKind,
    /// Butterfly violations are always `Medium`.
    pub severity: Severity,
    /// Grid coordinates and the variances compared.
    pub location: ViolationLocation,
}

/// Scans vol grids for calendar and butterfly violations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArbitrageDetector {
    policy: ArbitragePolicy,
}

impl ArbitrageDetector {
    /// Detector with the given thresholds.
    pub fn new(policy: ArbitragePolicy) -> Self {
        Self { policy }
    }

    /// Thresholds in use.
    pub fn policy(&self) -> &ArbitragePolicy {
        &self.policy
    }

    /// Scan `values[i][j]` (strike `i`, maturity `j`).
    ///
    /// Calendar violations come first, ordered by strike then maturity;
    /// butterfly violations follow, ordered by maturity then strike. Cells
    /// with a non-finite vol are skipped. Rows shorter than the maturity
    /// axis are scanned up to their length.
    ///
    /// # Examples
    /// ```
    /// use ivsurf::surface::{ArbitrageDetector, ViolationKind};
    ///
    /// let violations = ArbitrageDetector::default().detect(
    ///     &[90.0, 100.0, 110.0],
    ///     &[0.25],
    ///     &[vec![0.20], vec![0.35], vec![0.20]],
    /// );
    /// assert_eq!(violations.len(), 1);
    /// assert_eq!(violations[0].kind, ViolationKind::Butterfly);
    /// ```
    pub fn detect(&self, strikes: &[f64], maturities: &[f64], values: &[Vec<f64>]) -> Vec<ArbitrageViolation> {
        let mut violations = self.calendar(strikes, maturities, values);
        violations.extend(self.butterfly(strikes, maturities, values));

        #[cfg(feature = "logging")]
        if !violations.is_empty() {
            tracing::debug!(n_violations = violations.len(), "arbitrage violations detected");
        }

        violations
    }

    /// [`detect`](Self::detect) over a [`DenseGrid`]'s own axes.
    pub fn detect_grid(&self, grid: &DenseGrid) -> Vec<ArbitrageViolation> {
        self.detect(grid.strikes(), grid.maturities(), grid.values())
    }

    fn calendar(&self, strikes: &[f64], maturities: &[f64], values: &[Vec<f64>]) -> Vec<ArbitrageViolation> {
        let mut out = Vec::new();
        for (&strike, row) in strikes.iter().zip(values) {
            let n = row.len().min(maturities.len());
            for j in 1..n {
                let (t_short, t_long) = (maturities[j - 1], maturities[j]);
                if !(t_short < t_long) {
                    continue;
                }
                let (s_short, s_long) = (row[j - 1], row[j]);
                if !s_short.is_finite() || !s_long.is_finite() {
                    continue;
                }
                let var_short = Vol(s_short).total_variance(t_short).0;
                let var_long = Vol(s_long).total_variance(t_long).0;
                if var_short > var_long {
                    let severity = if var_short > self.policy.calendar_high_ratio * var_long {
                        Severity::High
                    } else {
                        Severity::Medium
                    };
                    out.push(ArbitrageViolation {
                        kind: ViolationKind::Calendar,
                        severity,
                        location: ViolationLocation::Calendar {
                            strike,
                            maturity_short: t_short,
                            maturity_long: t_long,
                            variance_short: var_short,
                            variance_long: var_long,
                        },
                    });
                }
            }
        }
        out
    }

    fn butterfly(&self, strikes: &[f64], maturities: &[f64], values: &[Vec<f64>]) -> Vec<ArbitrageViolation> {
        let mut out = Vec::new();
        let n_k = strikes.len().min(values.len());
        for (j, &maturity) in maturities.iter().enumerate() {
            for i in 1..n_k.saturating_sub(1) {
                let cell = |r: usize| values[r].get(j).copied().filter(|v| v.is_finite());
                let (Some(left), Some(center), Some(right)) = (cell(i - 1), cell(i), cell(i + 1)) else {
                    continue;
                };
                let center_variance = center * center;
                let midpoint_variance = 0.5 * (left * left + right * right);
                if center_variance > (1.0 + self.policy.butterfly_tolerance) * midpoint_variance {
                    out.push(ArbitrageViolation {
                        kind: ViolationKind::Butterfly,
                        severity: Severity::Medium,
                        location: ViolationLocation::Butterfly {
                            maturity,
                            strikes: [strikes[i - 1], strikes[i], strikes[i + 1]],
                            center_variance,
                            midpoint_variance,
                        },
                    });
                }
            }
        }
        out
    }
}

/// Violation counts for a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrageSummary {
    /// Calendar violations.
    pub calendar: usize,
    /// Butterfly violations.
    pub butterfly: usize,
    /// Violations of severity `High`.
    pub high: usize,
    /// Violations of severity `Medium`.
    pub medium: usize,
}

impl ArbitrageSummary {
    /// Count `violations` by kind and severity.
    pub fn from_violations(violations: &[ArbitrageViolation]) -> Self {
        violations.iter().fold(Self::default(), |mut s, v| {
            match v.kind {
                ViolationKind::Calendar => s.calendar += 1,
                ViolationKind::Butterfly => s.butterfly += 1,
            }
            match v.severity {
                Severity::High => s.high += 1,
                Severity::Medium => s.medium += 1,
            }
            s
        })
    }

    /// Number of violations counted.
    pub fn total(&self) -> usize {
        self.calendar + self.butterfly
    }

    /// No violation of either kind.
    pub fn is_free(&self) -> bool {
        self.total() == 0
    }
}
