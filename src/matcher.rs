use crate::all::*;

// Sparse matching kernel: pairs previous and current keypoints.
pub trait FeatureMatcher {
  fn match_features(&mut self, prev: &Features, curr: &Features, out: &mut Correspondences);
}

// Brute-force Hamming matching restricted to a window around each current keypoint.
pub struct WindowedMatcher {
  window: f64,
  max_distance: u32,
}

impl WindowedMatcher {
  pub fn new(p: &ParameterSet) -> WindowedMatcher {
    WindowedMatcher {
      window: p.match_window,
      max_distance: p.max_hamming,
    }
  }
}

impl FeatureMatcher for WindowedMatcher {
  fn match_features(&mut self, prev: &Features, curr: &Features, out: &mut Correspondences) {
    out.clear();
    for (p, d) in curr.keypoints.iter().zip(&curr.descriptors) {
      let mut best: Option<(u32, usize)> = None;
      for (j, q) in prev.keypoints.iter().enumerate() {
        if (p[0] - q[0]).abs() > self.window || (p[1] - q[1]).abs() > self.window { continue }
        let distance = hamming(d, &prev.descriptors[j]);
        if best.map_or(true, |(b, _)| distance < b) {
          best = Some((distance, j));
        }
      }
      if let Some((distance, j)) = best {
        if distance <= self.max_distance {
          out.push(prev.keypoints[j], *p);
        }
      }
    }
  }
}

fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
  a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn features(points: &[[f64; 2]], descriptors: &[Descriptor]) -> Features {
    Features {
      keypoints: points.iter().map(|p| Vector2d::new(p[0], p[1])).collect(),
      descriptors: descriptors.to_vec(),
    }
  }

  #[test]
  fn test_hamming() {
    assert_eq!(hamming(&[0; 4], &[0; 4]), 0);
    assert_eq!(hamming(&[0b1011, 0, 0, 1 << 63], &[0; 4]), 4);
  }

  #[test]
  fn test_nearest_descriptor_in_window() {
    let a = [0xffff, 0, 0, 0];
    let b = [0, 0xffff, 0, 0];
    let prev = features(&[[10., 10.], [20., 10.], [100., 100.]], &[a, b, a]);
    // The exact match at (100, 100) is outside the window of the first keypoint.
    let curr = features(&[[12., 11.], [103., 98.]], &[[0xfff0, 0, 0, 0], b]);
    let mut matcher = WindowedMatcher::new(&ParameterSet::default());
    let mut out = Correspondences::default();
    matcher.match_features(&prev, &curr, &mut out);
    assert_eq!(out.len(), 2);
    assert_eq!(out.prev[0], Vector2d::new(10., 10.));
    assert_eq!(out.curr[0], Vector2d::new(12., 11.));
    assert_eq!(out.prev[1], Vector2d::new(100., 100.));
  }

  #[test]
  fn test_distance_limit() {
    let prev = features(&[[10., 10.]], &[[0; 4]]);
    let curr = features(&[[10., 10.]], &[[!0, 1, 0, 0]]);
    let mut matcher = WindowedMatcher::new(&ParameterSet::default());
    let mut out = Correspondences::default();
    matcher.match_features(&prev, &curr, &mut out);
    assert_eq!(out.len(), 0);
    matcher.match_features(&Features::default(), &curr, &mut out);
    assert_eq!(out.len(), 0);
  }
}
