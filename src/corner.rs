// Shi-Tomasi corner response: the smaller eigenvalue of the gradient
// structure tensor summed over a small window around each pixel.

use crate::all::*;

pub struct CornerResponse {
  pub data: Vec<f32>,
  pub width: usize,
  pub height: usize,
  pub max: f32,
}

impl CornerResponse {
  #[inline(always)]
  pub fn value(&self, x: usize, y: usize) -> f32 {
    self.data[y * self.width + x]
  }
}

// Sobel gradients, `block` x `block` structure tensor window, replicated borders.
pub fn min_eigen_response(image: &Image, block: usize) -> CornerResponse {
  let w = image.width;
  let h = image.height;
  let mut xx = vec![0f32; w * h];
  let mut xy = vec![0f32; w * h];
  let mut yy = vec![0f32; w * h];
  for y in 0..h {
    for x in 0..w {
      let (gx, gy) = sobel(image, x as i64, y as i64);
      xx[y * w + x] = gx * gx;
      xy[y * w + x] = gx * gy;
      yy[y * w + x] = gy * gy;
    }
  }
  let r = (block / 2) as i64;
  let sxx = box_sum(&xx, w, h, r);
  let sxy = box_sum(&xy, w, h, r);
  let syy = box_sum(&yy, w, h, r);

  let mut max = 0f32;
  let data: Vec<f32> = (0..w * h).map(|i| {
    let a = 0.5 * sxx[i];
    let b = sxy[i];
    let c = 0.5 * syy[i];
    let v = (a + c) - ((a - c) * (a - c) + b * b).sqrt();
    max = max.max(v);
    v
  }).collect();
  CornerResponse { data, width: w, height: h, max }
}

#[inline(always)]
fn sobel(image: &Image, x: i64, y: i64) -> (f32, f32) {
  let v = |dx: i64, dy: i64| image.value_clamped(x + dx, y + dy) as f32;
  let gx = (v(1, -1) + 2. * v(1, 0) + v(1, 1)) - (v(-1, -1) + 2. * v(-1, 0) + v(-1, 1));
  let gy = (v(-1, 1) + 2. * v(0, 1) + v(1, 1)) - (v(-1, -1) + 2. * v(0, -1) + v(1, -1));
  (gx / 8., gy / 8.)
}

// Separable sum over a (2r+1)^2 window with replicated borders.
fn box_sum(src: &[f32], w: usize, h: usize, r: i64) -> Vec<f32> {
  let mut rows = vec![0f32; src.len()];
  for y in 0..h {
    for x in 0..w {
      let mut sum = 0.;
      for k in -r..=r {
        let xx = (x as i64 + k).clamp(0, w as i64 - 1) as usize;
        sum += src[y * w + xx];
      }
      rows[y * w + x] = sum;
    }
  }
  let mut out = vec![0f32; src.len()];
  for y in 0..h {
    for x in 0..w {
      let mut sum = 0.;
      for k in -r..=r {
        let yy = (y as i64 + k).clamp(0, h as i64 - 1) as usize;
        sum += rows[yy * w + x];
      }
      out[y * w + x] = sum;
    }
  }
  out
}
