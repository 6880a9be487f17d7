//! Delaunay triangulation (Bowyer-Watson) and piecewise-linear
//! interpolation over it.
//!
//! Points are expected in normalised coordinates (roughly the unit square)
//! so the in-circle test is not dominated by the strike scale.

use crate::error::{self, IvSurfError};

/// Half-width of the enclosing super-triangle.
const SUPER_SCALE: f64 = 1.0e3;
/// Relative margin for the in-circle test; near-cocircular points are
/// treated as outside.
const INCIRCLE_MARGIN: f64 = 1e-10;
/// Barycentric tolerance for point-in-triangle.
const BARY_TOL: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    r2: f64,
}

impl Triangle {
    fn new(v: [usize; 3], pts: &[(f64, f64)]) -> Self {
        let (ax, ay) = pts[v[0]];
        let (bx, by) = pts[v[1]];
        let (cx, cy) = pts[v[2]];
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d.abs() < f64::EPSILON {
            // Collinear: never report a point inside.
            return Self {
                v,
                cx: 0.0,
                cy: 0.0,
                r2: -1.0,
            };
        }
        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        Self {
            v,
            cx: ux,
            cy: uy,
            r2: (ax - ux).powi(2) + (ay - uy).powi(2),
        }
    }

    fn circumcircle_contains(&self, (px, py): (f64, f64)) -> bool {
        let d2 = (px - self.cx).powi(2) + (py - self.cy).powi(2);
        d2 < self.r2 * (1.0 - INCIRCLE_MARGIN)
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [(a, b), (b, c), (c, a)]
    }
}

fn same_edge(e: (usize, usize), f: (usize, usize)) -> bool {
    (e.0 == f.0 && e.1 == f.1) || (e.0 == f.1 && e.1 == f.0)
}

/// Delaunay triangulation of a point set.
#[derive(Debug, Clone)]
pub(crate) struct Triangulation {
    points: Vec<(f64, f64)>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Triangulate distinct points.
    ///
    /// # Errors
    /// Returns [`IvSurfError::NumericalError`] when fewer than 3 points are
    /// given or all points are collinear.
    pub(crate) fn new(points: &[(f64, f64)]) -> error::Result<Self> {
        if points.len() < 3 {
            return Err(IvSurfError::NumericalError {
                message: format!("triangulation needs at least 3 points, got {}", points.len()),
            });
        }

        let n = points.len();
        let mut pts = points.to_vec();
        pts.push((-SUPER_SCALE, -SUPER_SCALE));
        pts.push((3.0 * SUPER_SCALE, -SUPER_SCALE));
        pts.push((-SUPER_SCALE, 3.0 * SUPER_SCALE));

        let mut triangles = vec![Triangle::new([n, n + 1, n + 2], &pts)];

        for p in 0..n {
            let (bad, good): (Vec<Triangle>, Vec<Triangle>) = triangles
                .into_iter()
                .partition(|t| t.circumcircle_contains(pts[p]));

            // Cavity boundary: edges of bad triangles not shared with another bad one.
            let mut boundary: Vec<(usize, usize)> = Vec::new();
            for (ti, t) in bad.iter().enumerate() {
                for e in t.edges() {
                    let shared = bad
                        .iter()
                        .enumerate()
                        .any(|(tj, u)| tj != ti && u.edges().iter().any(|&f| same_edge(e, f)));
                    if !shared {
                        boundary.push(e);
                    }
                }
            }

            triangles = good;
            triangles.extend(boundary.into_iter().map(|(a, b)| Triangle::new([a, b, p], &pts)));
        }

        let triangles: Vec<[usize; 3]> = triangles
            .into_iter()
            .filter(|t| t.r2 > 0.0 && t.v.iter().all(|&v| v < n))
            .map(|t| t.v)
            .collect();

        if triangles.is_empty() {
            return Err(IvSurfError::NumericalError {
                message: "points are collinear, no triangle can be formed".into(),
            });
        }

        Ok(Self {
            points: points.to_vec(),
            triangles,
        })
    }

    /// Vertex indices of every triangle.
    pub(crate) fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Triangulated points, in input order.
    pub(crate) fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Triangle containing `p` and the barycentric coordinates of `p` in it.
    pub(crate) fn locate(&self, p: (f64, f64)) -> Option<(usize, [f64; 3])> {
        self.triangles.iter().enumerate().find_map(|(idx, tri)| {
            let (ax, ay) = self.points[tri[0]];
            let (bx, by) = self.points[tri[1]];
            let (cx, cy) = self.points[tri[2]];
            let det = (by - cy) * (ax - cx) + (cx - bx) * (ay - cy);
            if det.abs() < f64::EPSILON {
                return None;
            }
            let l1 = ((by - cy) * (p.0 - cx) + (cx - bx) * (p.1 - cy)) / det;
            let l2 = ((cy - ay) * (p.0 - cx) + (ax - cx) * (p.1 - cy)) / det;
            let l3 = 1.0 - l1 - l2;
            (l1 >= -BARY_TOL && l2 >= -BARY_TOL && l3 >= -BARY_TOL).then_some((idx, [l1, l2, l3]))
        })
    }

    /// Barycentric interpolation of `values` at `p`; NaN outside the hull.
    pub(crate) fn interpolate(&self, values: &[f64], p: (f64, f64)) -> f64 {
        match self.locate(p) {
            Some((idx, l)) => {
                let tri = self.triangles[idx];
                l[0] * values[tri[0]] + l[1] * values[tri[1]] + l[2] * values[tri[2]]
            }
            None => f64::NAN,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.triangles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn lattice(nx: usize, ny: usize) -> Vec<(f64, f64)> {
        let mut pts = Vec::new();
        for i in 0..nx {
            for j in 0..ny {
                pts.push((i as f64 / (nx - 1) as f64, j as f64 / (ny - 1) as f64));
            }
        }
        pts
    }

    #[test]
    fn square_gives_two_triangles() {
        let tri = Triangulation::new(&lattice(2, 2)).unwrap();
        assert_eq!(tri.len(), 2);
    }

    #[test]
    fn lattice_triangle_count_matches_euler() {
        // A convex nx × ny lattice with no interior collinear hull issues
        // has 2(nx-1)(ny-1) triangles.
        let tri = Triangulation::new(&lattice(5, 4)).unwrap();
        assert_eq!(tri.len(), 2 * 4 * 3);
    }

    #[test]
    fn reproduces_planar_data_exactly() {
        let pts = lattice(4, 4);
        let values: Vec<f64> = pts.iter().map(|(x, y)| 0.2 + 0.1 * x - 0.05 * y).collect();
        let tri = Triangulation::new(&pts).unwrap();
        for &(x, y) in &[(0.1, 0.2), (0.5, 0.5), (0.93, 0.07), (1.0, 1.0), (0.0, 0.0)] {
            assert_abs_diff_eq!(tri.interpolate(&values, (x, y)), 0.2 + 0.1 * x - 0.05 * y, epsilon = 1e-12);
        }
    }

    #[test]
    fn outside_hull_is_nan() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let tri = Triangulation::new(&pts).unwrap();
        assert!(tri.interpolate(&[1.0, 2.0, 3.0], (0.9, 0.9)).is_nan());
    }

    #[test]
    fn locate_returns_barycentric_weights() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let tri = Triangulation::new(&pts).unwrap();
        let (idx, l) = tri.locate((0.25, 0.25)).unwrap();
        assert_eq!(idx, 0);
        let v = tri.triangles()[0];
        let x: f64 = (0..3).map(|m| l[m] * tri.points()[v[m]].0).sum();
        let y: f64 = (0..3).map(|m| l[m] * tri.points()[v[m]].1).sum();
        assert_abs_diff_eq!(x, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(y, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(l.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(tri.locate((2.0, 2.0)).is_none());
    }

    #[test]
    fn collinear_points_fail() {
        let pts = vec![(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)];
        assert!(matches!(
            Triangulation::new(&pts),
            Err(IvSurfError::NumericalError { .. })
        ));
        assert!(Triangulation::new(&pts[..2]).is_err());
    }

    #[test]
    fn scattered_points_cover_their_hull() {
        let pts = vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (0.3, 0.6),
            (0.7, 0.2),
            (0.55, 0.8),
        ];
        let values = vec![1.0; pts.len()];
        let tri = Triangulation::new(&pts).unwrap();
        for i in 0..=10 {
            for j in 0..=10 {
                let v = tri.interpolate(&values, (i as f64 / 10.0, j as f64 / 10.0));
                assert_abs_diff_eq!(v, 1.0, epsilon = 1e-12);
            }
        }
    }
}
