//! Sparse strike × maturity grid of observed implied volatilities.
//!
//! Axes are the sorted distinct strikes and maturities actually quoted.
//! A cell holds the mean implied vol of every quote at exactly that
//! (strike, maturity) pair, or `None` when nothing was quoted there.

use serde::{Deserialize, Serialize};

use crate::quote::SolvedQuote;

/// One observed (strike, maturity, vol) point of the sparse grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    /// Strike price.
    pub strike: f64,
    /// Time to maturity in years.
    pub maturity: f64,
    /// Mean implied volatility at this node.
    pub implied_vol: f64,
}

/// Aggregated implied volatilities on the observed strike and maturity axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseGrid {
    strikes: Vec<f64>,
    maturities: Vec<f64>,
    /// Indexed `[strike][maturity]`.
    cells: Vec<Vec<Option<f64>>>,
}

impl SparseGrid {
    /// Group solved quotes by exact (strike, maturity) and average their vols.
    ///
    /// Quotes with a non-finite strike, maturity or vol are ignored. The
    /// result does not depend on input order: each group is summed in
    /// sorted order so any permutation yields bit-identical cells.
    ///
    /// # Examples
    /// ```
    /// use ivsurf::quote::SolvedQuote;
    /// use ivsurf::surface::SparseGrid;
    /// use ivsurf::types::{OptionType, Vol};
    ///
    /// let q = |k: f64, t: f64, v: f64| SolvedQuote {
    ///     strike: k, time_to_maturity: t, option_type: OptionType::Call,
    ///     market_price: 1.0, implied_vol: Vol(v),
    /// };
    /// let grid = SparseGrid::build(&[q(100.0, 0.5, 0.2), q(100.0, 0.5, 0.3), q(90.0, 0.5, 0.25)]);
    /// assert_eq!(grid.strikes(), &[90.0, 100.0]);
    /// assert!((grid.value(1, 0).unwrap() - 0.25).abs() < 1e-15);
    /// ```
    pub fn build(quotes: &[SolvedQuote]) -> Self {
        let usable: Vec<&SolvedQuote> = quotes
            .iter()
            .filter(|q| {
                q.strike.is_finite() && q.time_to_maturity.is_finite() && q.implied_vol.0.is_finite()
            })
            .collect();

        let strikes = sorted_distinct(usable.iter().map(|q| q.strike));
        let maturities = sorted_distinct(usable.iter().map(|q| q.time_to_maturity));

        let mut groups: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); maturities.len()]; strikes.len()];
        for q in &usable {
            let (Ok(i), Ok(j)) = (
                strikes.binary_search_by(|k| k.total_cmp(&q.strike)),
                maturities.binary_search_by(|t| t.total_cmp(&q.time_to_maturity)),
            ) else {
                continue;
            };
            groups[i][j].push(q.implied_vol.0);
        }

        let cells = groups
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|mut vols| {
                        if vols.is_empty() {
                            return None;
                        }
                        vols.sort_by(f64::total_cmp);
                        Some(vols.iter().sum::<f64>() / vols.len() as f64)
                    })
                    .collect()
            })
            .collect();

        Self {
            strikes,
            maturities,
            cells,
        }
    }

    /// Sorted distinct strikes.
    pub fn strikes(&self) -> &[f64] {
        &self.strikes
    }

    /// Sorted distinct maturities.
    pub fn maturities(&self) -> &[f64] {
        &self.maturities
    }

    /// Mean vol at `(strikes()[i], maturities()[j])`, if observed.
    pub fn value(&self, i: usize, j: usize) -> Option<f64> {
        self.cells.get(i).and_then(|row| row.get(j)).copied().flatten()
    }

    /// Observed nodes in strike-major, then maturity, order.
    pub fn points(&self) -> Vec<SurfacePoint> {
        let mut points = Vec::with_capacity(self.len());
        for (i, row) in self.cells.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                if let Some(v) = cell {
                    points.push(SurfacePoint {
                        strike: self.strikes[i],
                        maturity: self.maturities[j],
                        implied_vol: *v,
                    });
                }
            }
        }
        points
    }

    /// Number of observed cells.
    pub fn len(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Whether no cell was observed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean of all observed cell values, `None` for an empty grid.
    pub fn mean(&self) -> Option<f64> {
        let values: Vec<f64> = self.cells.iter().flatten().filter_map(|c| *c).collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn sorted_distinct(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v.dedup();
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OptionType, Vol};
    use approx::assert_abs_diff_eq;

    fn solved(strike: f64, maturity: f64, vol: f64) -> SolvedQuote {
        SolvedQuote {
            strike,
            time_to_maturity: maturity,
            option_type: OptionType::Call,
            market_price: 1.0,
            implied_vol: Vol(vol),
        }
    }

    #[test]
    fn empty_input_gives_empty_grid() {
        let grid = SparseGrid::build(&[]);
        assert!(grid.is_empty());
        assert!(grid.strikes().is_empty());
        assert!(grid.mean().is_none());
        assert!(grid.points().is_empty());
    }

    #[test]
    fn axes_are_sorted_and_distinct() {
        let grid = SparseGrid::build(&[
            solved(110.0, 0.5, 0.2),
            solved(90.0, 0.25, 0.3),
            solved(100.0, 0.5, 0.25),
            solved(90.0, 0.5, 0.28),
        ]);
        assert_eq!(grid.strikes(), &[90.0, 100.0, 110.0]);
        assert_eq!(grid.maturities(), &[0.25, 0.5]);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.value(1, 0), None);
        assert_eq!(grid.value(0, 0), Some(0.3));
        assert_eq!(grid.value(9, 9), None);
    }

    #[test]
    fn duplicate_quotes_are_averaged() {
        let grid = SparseGrid::build(&[
            solved(100.0, 0.5, 0.2),
            solved(100.0, 0.5, 0.4),
            solved(100.0, 0.5, 0.3),
        ]);
        assert_eq!(grid.len(), 1);
        assert_abs_diff_eq!(grid.value(0, 0).unwrap(), 0.3, epsilon = 1e-15);
    }

    #[test]
    fn reordered_input_yields_identical_grid() {
        let quotes = vec![
            solved(100.0, 0.5, 0.1),
            solved(100.0, 0.5, 0.2),
            solved(100.0, 0.5, 0.7),
            solved(95.0, 0.25, 0.33),
            solved(100.0, 0.5, 1e-3),
        ];
        let mut reversed = quotes.clone();
        reversed.reverse();
        let mut rotated = quotes.clone();
        rotated.rotate_left(2);

        let a = SparseGrid::build(&quotes);
        assert_eq!(a, SparseGrid::build(&reversed));
        assert_eq!(a, SparseGrid::build(&rotated));
    }

    #[test]
    fn non_finite_quotes_are_ignored() {
        let grid = SparseGrid::build(&[solved(100.0, 0.5, f64::NAN), solved(f64::INFINITY, 0.5, 0.2)]);
        assert!(grid.is_empty());
    }

    #[test]
    fn points_are_strike_major() {
        let grid = SparseGrid::build(&[
            solved(100.0, 1.0, 0.2),
            solved(100.0, 0.5, 0.21),
            solved(90.0, 1.0, 0.22),
        ]);
        let pts = grid.points();
        let coords: Vec<(f64, f64)> = pts.iter().map(|p| (p.strike, p.maturity)).collect();
        assert_eq!(coords, vec![(90.0, 1.0), (100.0, 0.5), (100.0, 1.0)]);
        assert_abs_diff_eq!(grid.mean().unwrap(), 0.21, epsilon = 1e-15);
    }
}
