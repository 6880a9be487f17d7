//! Clough-Tocher C¹ cubic interpolation over a Delaunay triangulation.
//!
//! Each triangle is split at its centroid into three cubic Bézier patches.
//! Vertex gradients are estimated by a weighted least-squares quadratic fit
//! over the vertex's neighbourhood. The cross-boundary derivative along
//! every triangle edge is made linear, so adjacent triangles join with
//! continuous first derivatives. Quadratic data is reproduced exactly.
//!
//! # References
//! - Farin, G. "Triangular Bernstein-Bézier patches", CAGD 3 (1986), §4.3
//! - Lai, M.-J. & Schumaker, L. "Spline Functions on Triangulations" (2007), Ch. 6

use std::collections::BTreeSet;

use nalgebra::{DMatrix, DVector};

use super::delaunay::Triangulation;

/// Relative singular value below which a fit is treated as rank deficient.
const RANK_TOL: f64 = 1e-10;
/// Singular values below this are dropped when solving.
const SVD_EPS: f64 = 1e-14;

type Vec2 = (f64, f64);

fn sub(a: Vec2, b: Vec2) -> Vec2 {
    (a.0 - b.0, a.1 - b.1)
}

fn dot(a: Vec2, b: Vec2) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

/// Clough-Tocher interpolant for values on the triangulation's points.
#[derive(Debug, Clone)]
pub(crate) struct CloughTocher<'a> {
    tri: &'a Triangulation,
    values: &'a [f64],
    gradients: Vec<Vec2>,
}

impl<'a> CloughTocher<'a> {
    pub(crate) fn new(tri: &'a Triangulation, values: &'a [f64]) -> Self {
        let gradients = estimate_gradients(tri, values);
        Self { tri, values, gradients }
    }

    /// Interpolated value at `p`; NaN outside the hull.
    pub(crate) fn eval(&self, p: Vec2) -> f64 {
        let Some((idx, l)) = self.tri.locate(p) else {
            return f64::NAN;
        };
        let v = self.tri.triangles()[idx];
        let pts = v.map(|i| self.tri.points()[i]);
        let f = v.map(|i| self.values[i]);
        let g = v.map(|i| self.gradients[i]);
        let centroid = (
            (pts[0].0 + pts[1].0 + pts[2].0) / 3.0,
            (pts[0].1 + pts[1].1 + pts[2].1) / 3.0,
        );

        // Control point on edge m→n next to vertex m.
        let edge_pt = |m: usize, n: usize| f[m] + dot(g[m], sub(pts[n], pts[m])) / 3.0;
        // First control point from vertex m towards the centroid.
        let p1: [f64; 3] = std::array::from_fn(|m| f[m] + dot(g[m], sub(centroid, pts[m])) / 3.0);

        // Interior point of the sub-triangle on edge (m, m+1), chosen so the
        // normal derivative along that edge is linear.
        let inner: [f64; 3] = std::array::from_fn(|m| {
            let n = (m + 1) % 3;
            let t = sub(pts[n], pts[m]);
            let u = sub(centroid, pts[m]);
            let normal = (-t.1, t.0);
            let det = t.0 * u.1 - t.1 * u.0;
            let d_n = (normal.0 * u.1 - normal.1 * u.0) / det;
            let d_c = (t.0 * normal.1 - t.1 * normal.0) / det;
            let d_m = -d_n - d_c;
            let (e_mn, e_nm) = (edge_pt(m, n), edge_pt(n, m));
            let q0 = d_m * f[m] + d_n * e_mn + d_c * p1[m];
            let q2 = d_m * e_nm + d_n * f[n] + d_c * p1[n];
            (0.5 * (q0 + q2) - d_m * e_mn - d_n * e_nm) / d_c
        });

        // Second control point towards the centroid, then the centroid value.
        let p2: [f64; 3] = std::array::from_fn(|m| (p1[m] + inner[m] + inner[(m + 2) % 3]) / 3.0);
        let centre = (p2[0] + p2[1] + p2[2]) / 3.0;

        // The sub-triangle holding p lies opposite the smallest weight.
        let k = (0..3).fold(0, |best, m| if l[m] < l[best] { m } else { best });
        let m = (k + 1) % 3;
        let n = (k + 2) % 3;
        let (a, b, c) = (l[m] - l[k], l[n] - l[k], 3.0 * l[k]);

        f[m] * a.powi(3)
            + f[n] * b.powi(3)
            + centre * c.powi(3)
            + 3.0
                * (edge_pt(m, n) * a * a * b
                    + edge_pt(n, m) * a * b * b
                    + p1[m] * a * a * c
                    + p2[m] * a * c * c
                    + p1[n] * b * b * c
                    + p2[n] * b * c * c)
            + 6.0 * inner[m] * a * b * c
    }
}

/// Per-vertex gradients from weighted least squares over each vertex's
/// triangulation neighbours.
///
/// The quadratic model is fitted on the first ring, then on the first two
/// rings when the first is too small or degenerate. If both fail the plane
/// alone is fitted on the first ring.
fn estimate_gradients(tri: &Triangulation, values: &[f64]) -> Vec<Vec2> {
    let n = tri.points().len();
    let mut rings: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for t in tri.triangles() {
        for a in 0..3 {
            for b in 0..3 {
                if a != b {
                    rings[t[a]].insert(t[b]);
                }
            }
        }
    }

    let samples = |i: usize, hood: &BTreeSet<usize>| -> Vec<(Vec2, f64)> {
        let origin = tri.points()[i];
        hood.iter()
            .map(|&j| (sub(tri.points()[j], origin), values[j] - values[i]))
            .collect()
    };

    (0..n)
        .map(|i| {
            let first = samples(i, &rings[i]);
            let mut wide = rings[i].clone();
            for &j in &rings[i] {
                wide.extend(rings[j].iter().copied().filter(|&k| k != i));
            }
            fit_gradient(&first, Model::Quadratic)
                .or_else(|| fit_gradient(&samples(i, &wide), Model::Quadratic))
                .or_else(|| fit_gradient(&first, Model::Plane))
                .unwrap_or((0.0, 0.0))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Model {
    Plane,
    Quadratic,
}

/// Fit `Δf ≈ g·Δx (+ ½ Δxᵀ H Δx)` with rows weighted by inverse distance.
///
/// Returns `None` when the samples do not determine every coefficient.
fn fit_gradient(samples: &[(Vec2, f64)], model: Model) -> Option<Vec2> {
    let cols = match model {
        Model::Plane => 2,
        Model::Quadratic => 5,
    };

    let mut design = Vec::with_capacity(samples.len() * cols);
    let mut rhs = Vec::with_capacity(samples.len());
    for &((dx, dy), df) in samples {
        let w = 1.0 / dx.hypot(dy);
        if !w.is_finite() {
            continue;
        }
        design.extend_from_slice(&[dx * w, dy * w]);
        if model == Model::Quadratic {
            design.extend_from_slice(&[0.5 * dx * dx * w, dx * dy * w, 0.5 * dy * dy * w]);
        }
        rhs.push(df * w);
    }
    let rows = rhs.len();
    if rows < cols {
        return None;
    }

    let svd = DMatrix::from_row_slice(rows, cols, &design).svd(true, true);
    if svd.singular_values.min() <= RANK_TOL * svd.singular_values.max() {
        return None;
    }
    let x = svd.solve(&DVector::from_vec(rhs), SVD_EPS).ok()?;
    let g = (x[0], x[1]);
    (g.0.is_finite() && g.1.is_finite()).then_some(g)
}
