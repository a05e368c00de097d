// Robust projective fit between two point sets: RANSAC over minimal
// four-point samples solved with the normalized direct linear transform,
// followed by a least squares refit on the inliers.

use crate::all::*;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

const SAMPLE_SIZE: usize = 4;
const CONFIDENCE: f64 = 0.995;

#[derive(Clone, Debug)]
pub struct HomographyFit {
  pub h: Matrix3d,
  pub inliers: Vec<bool>,
}

impl HomographyFit {
  pub fn inlier_count(&self) -> usize {
    self.inliers.iter().filter(|x| **x).count()
  }
}

// Projective fitting kernel mapping `prev` points onto `curr` points.
pub trait HomographySolver {
  fn find(&mut self, prev: &[Vector2d], curr: &[Vector2d]) -> Option<HomographyFit>;
}

pub struct RansacHomography {
  threshold: f64,
  max_iters: usize,
  seed: u64,
}

impl RansacHomography {
  pub fn new(p: &ParameterSet) -> RansacHomography {
    RansacHomography {
      threshold: p.ransac_threshold,
      max_iters: p.ransac_iters,
      seed: p.ransac_seed,
    }
  }

  fn mark_inliers(&self, h: &Matrix3d, prev: &[Vector2d], curr: &[Vector2d], inliers: &mut Vec<bool>) -> usize {
    inliers.clear();
    inliers.extend(prev.iter().zip(curr).map(|(p, c)| {
      project(h, p).map_or(false, |q| (q - c).norm() <= self.threshold)
    }));
    inliers.iter().filter(|x| **x).count()
  }
}

impl HomographySolver for RansacHomography {
  fn find(&mut self, prev: &[Vector2d], curr: &[Vector2d]) -> Option<HomographyFit> {
    assert_eq!(prev.len(), curr.len());
    let n = prev.len();
    if n < SAMPLE_SIZE { return None }

    // Same input, same answer.
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
    let mut best: Option<(Matrix3d, usize)> = None;
    let mut inliers = Vec::with_capacity(n);
    let mut iters = self.max_iters;
    let mut i = 0;
    let mut sample_prev = [Vector2d::zeros(); SAMPLE_SIZE];
    let mut sample_curr = [Vector2d::zeros(); SAMPLE_SIZE];
    while i < iters {
      i += 1;
      let indices = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
      for (k, j) in indices.iter().enumerate() {
        sample_prev[k] = prev[j];
        sample_curr[k] = curr[j];
      }
      let h = match dlt(&sample_prev, &sample_curr) {
        Some(h) => h,
        None => continue,
      };
      let count = self.mark_inliers(&h, prev, curr, &mut inliers);
      if best.map_or(true, |(_, c)| count > c) {
        best = Some((h, count));
        iters = usize::min(iters, required_iterations(count as f64 / n as f64));
      }
    }

    let (h, count) = best?;
    if count < SAMPLE_SIZE { return None }
    self.mark_inliers(&h, prev, curr, &mut inliers);
    let inlier_prev: Vec<Vector2d> = (0..n).filter(|j| inliers[*j]).map(|j| prev[j]).collect();
    let inlier_curr: Vec<Vector2d> = (0..n).filter(|j| inliers[*j]).map(|j| curr[j]).collect();
    let h = dlt(&inlier_prev, &inlier_curr).unwrap_or(h);
    self.mark_inliers(&h, prev, curr, &mut inliers);
    Some(HomographyFit { h, inliers })
  }
}

// Iterations needed to draw one all-inlier sample with `CONFIDENCE`.
fn required_iterations(inlier_ratio: f64) -> usize {
  let good = inlier_ratio.powi(SAMPLE_SIZE as i32);
  if good >= 1. { return 1 }
  if good <= 0. { return usize::MAX }
  let n = (1. - CONFIDENCE).ln() / (1. - good).ln();
  if n.is_finite() { n.ceil().max(1.) as usize } else { usize::MAX }
}

pub fn project(h: &Matrix3d, p: &Vector2d) -> Option<Vector2d> {
  let q = h * Vector3d::new(p[0], p[1], 1.);
  if q[2].abs() < 1e-12 { return None }
  Some(Vector2d::new(q[0] / q[2], q[1] / q[2]))
}

// Translate the centroid to origin and scale the mean distance to sqrt(2).
fn normalize_points(points: &[Vector2d]) -> (Matrix3d, Vec<Vector2d>) {
  let n = points.len() as f64;
  let c = points.iter().sum::<Vector2d>() / n;
  let mean_distance = points.iter().map(|p| (p - c).norm()).sum::<f64>() / n;
  let s = if mean_distance > 1e-12 { std::f64::consts::SQRT_2 / mean_distance } else { 1. };
  let t = Matrix3d::new(
    s, 0., -s * c[0],
    0., s, -s * c[1],
    0., 0., 1.,
  );
  (t, points.iter().map(|p| s * (p - c)).collect())
}

// Least squares H with curr ~ H prev from at least four pairs.
fn dlt(prev: &[Vector2d], curr: &[Vector2d]) -> Option<Matrix3d> {
  let n = prev.len();
  if n < SAMPLE_SIZE { return None }
  let (t_prev, prev_n) = normalize_points(prev);
  let (t_curr, curr_n) = normalize_points(curr);

  let mut a = DMatrix::<f64>::zeros(2 * n, 9);
  for i in 0..n {
    let (sx, sy) = (prev_n[i][0], prev_n[i][1]);
    let (dx, dy) = (curr_n[i][0], curr_n[i][1]);
    a[(2 * i, 3)] = -sx;
    a[(2 * i, 4)] = -sy;
    a[(2 * i, 5)] = -1.;
    a[(2 * i, 6)] = dy * sx;
    a[(2 * i, 7)] = dy * sy;
    a[(2 * i, 8)] = dy;
    a[(2 * i + 1, 0)] = sx;
    a[(2 * i + 1, 1)] = sy;
    a[(2 * i + 1, 2)] = 1.;
    a[(2 * i + 1, 6)] = -dx * sx;
    a[(2 * i + 1, 7)] = -dx * sy;
    a[(2 * i + 1, 8)] = -dx;
  }

  // Null vector of A is the eigenvector of the smallest eigenvalue of AᵀA.
  let eig = nalgebra::SymmetricEigen::new(a.transpose() * &a);
  let mut min_index = 0;
  for i in 1..9 {
    if eig.eigenvalues[i].abs() < eig.eigenvalues[min_index].abs() {
      min_index = i;
    }
  }
  let v = eig.eigenvectors.column(min_index);
  let h_norm = Matrix3d::new(
    v[0], v[1], v[2],
    v[3], v[4], v[5],
    v[6], v[7], v[8],
  );
  let h = t_curr.try_inverse()? * h_norm * t_prev;
  if h[(2, 2)].abs() < 1e-12 || !h.iter().all(|x| x.is_finite()) { return None }
  Some(h / h[(2, 2)])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn grid(n: usize) -> Vec<Vector2d> {
    let mut points = vec![];
    for y in 0..n {
      for x in 0..n {
        points.push(Vector2d::new(10. + 17. * x as f64, 5. + 13. * y as f64));
      }
    }
    points
  }

  fn reference_h() -> Matrix3d {
    Matrix3d::new(
      1.02, 0.03, 4.,
      -0.02, 0.98, -3.,
      1e-4, -5e-5, 1.,
    )
  }

  #[test]
  fn test_dlt_exact() {
    let h = reference_h();
    let prev = grid(3);
    let curr: Vec<Vector2d> = prev.iter().map(|p| project(&h, p).unwrap()).collect();
    let fit = dlt(&prev, &curr).unwrap();
    assert!((fit - h).abs().max() < 1e-6);
    assert!(dlt(&prev[..3], &curr[..3]).is_none());
  }

  #[test]
  fn test_ransac_rejects_outliers() {
    let h = reference_h();
    let prev = grid(8);
    let mut curr: Vec<Vector2d> = prev.iter().map(|p| project(&h, p).unwrap()).collect();
    // Every fourth pair is garbage.
    for (i, c) in curr.iter_mut().enumerate() {
      if i % 4 == 0 {
        *c += Vector2d::new(15. + i as f64, -20.);
      }
    }
    let mut solver = RansacHomography::new(&ParameterSet::default());
    let fit = solver.find(&prev, &curr).unwrap();
    assert_eq!(fit.inlier_count(), 48);
    for i in 0..prev.len() {
      assert_eq!(fit.inliers[i], i % 4 != 0);
    }
    assert!((fit.h - h).abs().max() < 1e-6);
  }

  #[test]
  fn test_deterministic() {
    let prev = grid(6);
    let curr: Vec<Vector2d> = prev.iter().enumerate()
      .map(|(i, p)| p + Vector2d::new(2. + 0.3 * (i % 3) as f64, -1.))
      .collect();
    let mut solver = RansacHomography::new(&ParameterSet::default());
    let a = solver.find(&prev, &curr).unwrap();
    let b = solver.find(&prev, &curr).unwrap();
    assert_eq!(a.h, b.h);
    assert_eq!(a.inliers, b.inliers);
  }

  #[test]
  fn test_too_few_points() {
    let mut solver = RansacHomography::new(&ParameterSet::default());
    let p = grid(1);
    assert!(solver.find(&p, &p).is_none());
  }

  #[test]
  fn test_required_iterations() {
    assert_eq!(required_iterations(1.), 1);
    assert_eq!(required_iterations(0.), usize::MAX);
    assert!(required_iterations(0.5) > required_iterations(0.9));
  }
}
