//! Pixel/world homographies fitted with the normalized DLT.

use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};

const EPS: f64 = 1e-12;

/// Planar projective transform `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    /// Map one point.
    ///
    /// Returns `None` when the point lands on the line at infinity or the
    /// result is not finite.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        if v.z.abs() < EPS {
            return None;
        }
        let out = Point2::new(v.x / v.z, v.y / v.z);
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }

    /// Undo the conditioning of both point sets and scale so `h33 == 1`.
    fn from_conditioned(hn: Matrix3<f64>, src: &Normalizer, dst: &Normalizer) -> Option<Self> {
        let h = dst.inverse_matrix() * hn * src.matrix();
        let s = h[(2, 2)];
        (s.abs() >= EPS).then(|| Self::new(h / s))
    }
}

/// Similarity that moves a point set's centroid to the origin and its mean
/// distance from it to `sqrt(2)`.
struct Normalizer {
    cx: f64,
    cy: f64,
    scale: f64,
}

impl Normalizer {
    fn fit(pts: &[Point2<f64>]) -> Self {
        let n = pts.len() as f64;
        let cx = pts.iter().map(|p| p.x).sum::<f64>() / n;
        let cy = pts.iter().map(|p| p.y).sum::<f64>() / n;
        let mean_dist = pts.iter().map(|p| (p.x - cx).hypot(p.y - cy)).sum::<f64>() / n;
        let scale = if mean_dist > EPS {
            std::f64::consts::SQRT_2 / mean_dist
        } else {
            1.0
        };
        Self { cx, cy, scale }
    }

    fn apply(&self, p: Point2<f64>) -> (f64, f64) {
        ((p.x - self.cx) * self.scale, (p.y - self.cy) * self.scale)
    }

    fn matrix(&self) -> Matrix3<f64> {
        let s = self.scale;
        Matrix3::new(s, 0.0, -s * self.cx, 0.0, s, -s * self.cy, 0.0, 0.0, 1.0)
    }

    fn inverse_matrix(&self) -> Matrix3<f64> {
        let s = 1.0 / self.scale;
        Matrix3::new(s, 0.0, self.cx, 0.0, s, self.cy, 0.0, 0.0, 1.0)
    }
}

/// The two DLT equations contributed by `(x, y) -> (u, v)`.
fn dlt_rows((x, y): (f64, f64), (u, v): (f64, f64)) -> [[f64; 9]; 2] {
    [
        [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, -u],
        [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, -v],
    ]
}

fn conditioned_rows<'a>(
    src: &'a [Point2<f64>],
    dst: &'a [Point2<f64>],
    ns: &'a Normalizer,
    nd: &'a Normalizer,
) -> impl Iterator<Item = [f64; 9]> + 'a {
    src.iter()
        .zip(dst)
        .flat_map(move |(s, d)| dlt_rows(ns.apply(*s), nd.apply(*d)))
}

/// Least-squares homography `dst ~ H * src` over every correspondence.
///
/// Both point sets are conditioned, the `2N x 9` system is solved through
/// SVD and the result scaled so `h33 == 1`. Exactly four pairs take the
/// direct solve of [`homography_from_4pt`].
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    if let (Ok(s), Ok(d)) = (
        <&[Point2<f64>; 4]>::try_from(src),
        <&[Point2<f64>; 4]>::try_from(dst),
    ) {
        return homography_from_4pt(s, d);
    }

    let (ns, nd) = (Normalizer::fit(src), Normalizer::fit(dst));
    let rows: Vec<[f64; 9]> = conditioned_rows(src, dst, &ns, &nd).collect();
    let a = DMatrix::<f64>::from_fn(rows.len(), 9, |r, c| rows[r][c]);

    // At least 10 rows, so V^T is 9 x 9 and its last row spans the null space.
    let vt = a.svd(false, true).v_t?;
    let h = vt.row(vt.nrows().checked_sub(1)?);
    let hn = Matrix3::from_fn(|r, c| h[3 * r + c]);
    Homography::from_conditioned(hn, &ns, &nd)
}

/// Exact homography from four correspondences (`h33` fixed to 1).
///
/// Point order must agree between `src` and `dst`.
pub fn homography_from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Homography> {
    let (ns, nd) = (Normalizer::fit(src), Normalizer::fit(dst));

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (r, row) in conditioned_rows(src, dst, &ns, &nd).enumerate() {
        for c in 0..8 {
            a[(r, c)] = row[c];
        }
        b[r] = -row[8];
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::from_fn(|r, c| if r == 2 && c == 2 { 1.0 } else { x[3 * r + c] });
    Homography::from_conditioned(hn, &ns, &nd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gauge_truth() -> Homography {
        // target plane seen from slightly above and left
        Homography::from_array([
            [6.5, 0.4, 310.0],
            [-0.3, -5.8, 640.0],
            [0.0004, -0.0009, 1.0],
        ])
    }

    fn world_grid() -> Vec<Point2<f64>> {
        (0..4)
            .rev()
            .flat_map(|r| (0..2).map(move |c| Point2::new(c as f64 * 50.0, r as f64 * 30.0)))
            .collect()
    }

    #[test]
    fn independent_fits_round_trip_points() {
        let h = gauge_truth();
        let world = world_grid();
        let pix: Vec<_> = world.iter().map(|&p| h.apply(p).unwrap()).collect();
        let forward = estimate_homography(&world, &pix).expect("forward");
        let backward = estimate_homography(&pix, &world).expect("backward");
        for p in world {
            let back = backward.apply(forward.apply(p).unwrap()).unwrap();
            assert_relative_eq!(back.x, p.x, epsilon = 1e-6);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn four_points_recover_h() {
        let truth = gauge_truth();
        let src = [
            Point2::new(0.0, 90.0),
            Point2::new(50.0, 90.0),
            Point2::new(0.0, 0.0),
            Point2::new(50.0, 0.0),
        ];
        let dst = src.map(|p| truth.apply(p).unwrap());
        let h = homography_from_4pt(&src, &dst).expect("solvable");
        let mid = Point2::new(25.0, 45.0);
        let (a, b) = (h.apply(mid).unwrap(), truth.apply(mid).unwrap());
        assert_relative_eq!(a.x, b.x, epsilon = 1e-6);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-6);
        assert_relative_eq!(h.h[(2, 2)], 1.0);
    }

    #[test]
    fn dlt_uses_all_points() {
        let truth = gauge_truth();
        let world = world_grid();
        let pix: Vec<_> = world.iter().map(|&p| truth.apply(p).unwrap()).collect();
        let h = estimate_homography(&world, &pix).expect("estimate");
        for (w, p) in world.iter().zip(&pix) {
            let q = h.apply(*w).unwrap();
            assert_relative_eq!(q.x, p.x, epsilon = 1e-6);
            assert_relative_eq!(q.y, p.y, epsilon = 1e-6);
        }
        assert_relative_eq!(h.h, truth.h, epsilon = 1e-6);
    }

    #[test]
    fn points_at_infinity_do_not_map() {
        let h = Homography::from_array([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        assert!(h.apply(Point2::new(0.0, 3.0)).is_none());
        assert!(h.apply(Point2::new(2.0, 3.0)).is_some());
    }

    #[test]
    fn mismatched_or_short_input_fails() {
        let a = [Point2::new(0.0, 0.0); 4];
        let b = [Point2::new(1.0, 1.0); 3];
        assert!(estimate_homography(&a, &b).is_none());
        assert!(estimate_homography(&b, &b).is_none());
    }

    #[test]
    fn degenerate_points_do_not_panic() {
        let a = vec![Point2::new(5.0, 5.0); 6];
        let _ = estimate_homography(&a, &a);
    }
}
