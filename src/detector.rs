use crate::all::*;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

// Values 9 and 12 are popular, allowing quick rejection logic.
const FAST_VARIANT_N: usize = 9;

// A Bresenham circle.
const CIRCLE_RADIUS: usize = 3;
const CIRCLE: [[i32; 2]; 16] = [
  [ 0, -3], [ 1, -3], [ 2, -2], [ 3, -1], [ 3,  0], [ 3,  1], [ 2,  2], [ 1,  3],
  [ 0,  3], [-1,  3], [-2,  2], [-3,  1], [-3,  0], [-3, -1], [-2, -2], [-1, -3],
];

// BRIEF test pairs are drawn inside this radius around the keypoint.
const PATCH_RADIUS: usize = 12;
const PATTERN_SEED: u64 = 0x5eed;
const BLUR_RADIUS: usize = 2;

// 256 binary intensity comparisons.
pub type Descriptor = [u64; 4];

#[derive(Clone, Debug, Default)]
pub struct Features {
  pub keypoints: Vec<Vector2d>,
  pub descriptors: Vec<Descriptor>,
}

impl Features {
  pub fn clear(&mut self) {
    self.keypoints.clear();
    self.descriptors.clear();
  }

  pub fn len(&self) -> usize {
    self.keypoints.len()
  }
}

// Sparse feature kernel: keypoints and descriptors where `mask` is nonzero.
pub trait FeatureDetector {
  fn detect(&mut self, image: &Image, mask: &Image, features: &mut Features) -> Result<()>;
}

// FAST corners described with BRIEF.
pub struct Detector {
  pub threshold: i16,
  max_features: usize,
  pattern: Vec<[[i32; 2]; 2]>,
  // Workspace.
  scores: Vec<i32>,
  candidates: Vec<(i32, usize)>,
}

impl Detector {
  pub fn new(p: &ParameterSet) -> Detector {
    // Fixed seed so descriptors of consecutive frames are comparable.
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(PATTERN_SEED);
    let r = PATCH_RADIUS as i32;
    let pattern = (0..256)
      .map(|_| [
        [rng.gen_range(-r..=r), rng.gen_range(-r..=r)],
        [rng.gen_range(-r..=r), rng.gen_range(-r..=r)],
      ])
      .collect();
    Detector {
      threshold: p.fast_threshold,
      max_features: p.max_features,
      pattern,
      scores: vec![],
      candidates: vec![],
    }
  }

  // Sum of the circle contrast above threshold, 0 for non-corners.
  fn score_at_pixel(&self, x: i32, y: i32, image: &Image) -> i32 {
    let center_value = value(x, y, image);
    let t = self.threshold;
    let dark = continuous(x, y, image, |v| v < center_value - t);
    let bright = continuous(x, y, image, |v| v > center_value + t);
    if !dark && !bright { return 0 }
    CircleIterator::new(x, y)
      .map(|p| ((value(p[0], p[1], image) - center_value).abs() - t).max(0) as i32)
      .sum::<i32>()
      .max(1)
  }

  fn describe(&self, blurred: &Image, x: i32, y: i32) -> Descriptor {
    let mut d = [0u64; 4];
    for (k, pair) in self.pattern.iter().enumerate() {
      let a = value(x + pair[0][0], y + pair[0][1], blurred);
      let b = value(x + pair[1][0], y + pair[1][1], blurred);
      if a < b {
        d[k / 64] |= 1 << (k % 64);
      }
    }
    d
  }
}

impl FeatureDetector for Detector {
  fn detect(&mut self, image: &Image, mask: &Image, features: &mut Features) -> Result<()> {
    if mask.width != image.width || mask.height != image.height {
      bail!("Detection mask size {}x{} differs from image size {}x{}.",
        mask.width, mask.height, image.width, image.height);
    }
    features.clear();
    let (w, h) = (image.width, image.height);
    let border = usize::max(PATCH_RADIUS, CIRCLE_RADIUS);
    if w <= 2 * border || h <= 2 * border { return Ok(()) }

    self.scores.clear();
    self.scores.resize(w * h, 0);
    for y in border .. (h - border) {
      for x in border .. (w - border) {
        if mask.value(x, y) == 0 { continue }
        self.scores[y * w + x] = self.score_at_pixel(x as i32, y as i32, image);
      }
    }

    // 3x3 non-maximum suppression, ties resolved in raster order.
    self.candidates.clear();
    for y in border .. (h - border) {
      for x in border .. (w - border) {
        let s = self.scores[y * w + x];
        if s == 0 { continue }
        let mut is_max = true;
        for (dx, dy) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)] {
          let n = self.scores[(y as i64 + dy) as usize * w + (x as i64 + dx) as usize];
          let before = dy < 0 || (dy == 0 && dx < 0);
          if n > s || (before && n == s) {
            is_max = false;
            break;
          }
        }
        if is_max {
          self.candidates.push((s, y * w + x));
        }
      }
    }
    self.candidates.sort_by(|a, b| b.0.cmp(&a.0));
    self.candidates.truncate(self.max_features);

    let blurred = image.box_blur(BLUR_RADIUS);
    for (_, i) in &self.candidates {
      let (x, y) = ((i % w) as i32, (i / w) as i32);
      features.keypoints.push(Vector2d::new(x as f64, y as f64));
      features.descriptors.push(self.describe(&blurred, x, y));
    }
    Ok(())
  }
}

// Arcs may wrap around the end of the circle.
fn continuous<F: Fn(i16) -> bool>(x: i32, y: i32, image: &Image, f: F) -> bool {
  // Quick rejection for 9 and 12 variants.
  if !f(value(x + 3, y, image)) && !f(value(x - 3, y, image)) { return false }

  let it = CircleIterator::new(x, y);
  let mut n = 0;
  for p in it.chain(CircleIterator::new(x, y).take(FAST_VARIANT_N - 1)) {
    let v = value(p[0], p[1], image);
    if f(v) {
      n += 1;
      if n >= FAST_VARIANT_N { return true }
    }
    else {
      n = 0;
    }
  }
  false
}

struct CircleIterator {
  center: [i32; 2],
  ind: usize,
}

impl CircleIterator {
  pub fn new(x: i32, y:i32) -> CircleIterator {
    CircleIterator {
      center: [x, y],
      ind: 0,
    }
  }
}

impl Iterator for CircleIterator {
  type Item = [i32; 2];

  fn next(&mut self) -> Option<Self::Item> {
    if self.ind >= CIRCLE.len() { return None }
    self.ind += 1;
    Some([
      self.center[0] + CIRCLE[self.ind - 1][0],
      self.center[1] + CIRCLE[self.ind - 1][1],
    ])
  }
}

fn value(x: i32, y: i32, image: &Image) -> i16 {
  image.value_i32(x, y) as i16
}
