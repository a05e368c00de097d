// Dense pyramidal Lucas-Kanade flow based on:
// <http://robots.stanford.edu/cs223b04/algo_tracking.pdf>
// “Pyramidal Implementation of the Lucas Kanade Feature Tracker
//   Description of the algorithm” by Jean-Yves Bouguet
//
// Every pixel of a level is tracked as its own feature, with the window
// centered on it.

use crate::all::*;

// Per-pixel displacement from the first image to the second one.
#[derive(Clone, Debug, Default)]
pub struct FlowField {
  pub x: Vec<f32>,
  pub y: Vec<f32>,
  pub width: usize,
  pub height: usize,
}

impl FlowField {
  pub fn new(width: usize, height: usize) -> FlowField {
    FlowField {
      x: vec![0.; width * height],
      y: vec![0.; width * height],
      width,
      height,
    }
  }

  pub fn reset(&mut self, width: usize, height: usize) {
    self.width = width;
    self.height = height;
    self.x.clear();
    self.x.resize(width * height, 0.);
    self.y.clear();
    self.y.resize(width * height, 0.);
  }

  #[inline(always)]
  pub fn at(&self, x: usize, y: usize) -> Vector2d {
    let i = y * self.width + x;
    Vector2d::new(self.x[i] as f64, self.y[i] as f64)
  }
}

// Dense flow kernel: called once per scale and frame, blocking.
pub trait DenseFlow {
  fn compute(&mut self, prev: &Image, next: &Image, flow: &mut FlowField) -> Result<()>;
}

pub struct LucasKanadeFlow {
  lk_iters: usize,
  lk_levels: usize,
  lk_win_size: usize,
  // Workspace.
  levels0: Vec<Image>,
  levels1: Vec<Image>,
  coarse: FlowField,
}

// Levels smaller than this are not worth tracking on.
const MIN_LEVEL_SIZE: usize = 8;
// Smallest eigenvalue of the structure tensor per window sample. Windows
// below it are textureless and keep their current guess.
const MIN_EIGENVALUE: f64 = 0.1;
// Iterations stop after an update shorter than this.
const MIN_STEP: f64 = 0.01;

// Window sums of the structure tensor and of the mismatch vector.
#[derive(Default)]
struct WindowSums {
  xx: f64,
  xy: f64,
  yy: f64,
  bx: f64,
  by: f64,
  abs_diff: f64,
  n: usize,
}

impl WindowSums {
  fn mean_error(&self) -> f64 {
    if self.n == 0 { f64::INFINITY } else { self.abs_diff / self.n as f64 }
  }

  // Gauss-Newton update, `None` when the window has too little texture.
  fn step(&self) -> Option<Vector2d> {
    if self.n == 0 { return None }
    let d = self.xx - self.yy;
    let min_eigenvalue = 0.5 * (self.xx + self.yy - (d * d + 4. * self.xy * self.xy).sqrt());
    if !(min_eigenvalue >= MIN_EIGENVALUE * self.n as f64) { return None }
    let det = self.xx * self.yy - self.xy * self.xy;
    Some(Vector2d::new(
      (self.yy * self.bx - self.xy * self.by) / det,
      (self.xx * self.by - self.xy * self.bx) / det,
    ))
  }
}

// One level of both images and the gradients of the first one.
#[allow(non_snake_case)]
struct Level<'a> {
  I0: &'a Image,
  I1: &'a Image,
  Ix: Vec<f32>,
  Iy: Vec<f32>,
}

impl<'a> Level<'a> {
  #[allow(non_snake_case)]
  fn new(I0: &'a Image, I1: &'a Image) -> Level<'a> {
    let (Ix, Iy) = scharr(I0);
    Level { I0, I1, Ix, Iy }
  }

  // Window of radius `r` around `(x, y)` compared against the second image
  // displaced by `d`. Samples displaced outside the second image are skipped.
  fn window_sums(&self, x: usize, y: usize, r: usize, d: &Vector2d) -> WindowSums {
    let w = self.I0.width;
    let h = self.I0.height;
    let max_x = (w - 1) as f64;
    let max_y = (h - 1) as f64;
    let mut s = WindowSums::default();
    for v in y.saturating_sub(r)..usize::min(y + r + 1, h) {
      for u in x.saturating_sub(r)..usize::min(x + r + 1, w) {
        let tx = u as f64 + d[0];
        let ty = v as f64 + d[1];
        if !(tx >= 0. && ty >= 0. && tx <= max_x && ty <= max_y) { continue }
        let j = v * w + u;
        let gx = self.Ix[j] as f64;
        let gy = self.Iy[j] as f64;
        let diff = self.I0.data[j] as f64 - self.I1.bilinear(tx, ty);
        s.xx += gx * gx;
        s.xy += gx * gy;
        s.yy += gy * gy;
        s.bx += gx * diff;
        s.by += gy * diff;
        s.abs_diff += diff.abs();
        s.n += 1;
      }
    }
    s
  }
}

impl LucasKanadeFlow {
  pub fn new(p: &ParameterSet) -> Result<LucasKanadeFlow> {
    if p.lk_win_size % 2 != 1 {
      bail!("Lucas-Kanade window size must be odd number.");
    }
    if p.lk_win_size < 3 {
      bail!("Lucas-Kanade window size must be at least 3.");
    }
    Ok(LucasKanadeFlow {
      lk_iters: p.lk_iters,
      lk_levels: p.lk_levels,
      lk_win_size: p.lk_win_size,
      levels0: vec![],
      levels1: vec![],
      coarse: FlowField::default(),
    })
  }

  fn build_levels(&mut self, prev: &Image, next: &Image) {
    self.levels0.clear();
    self.levels1.clear();
    self.levels0.push(prev.clone());
    self.levels1.push(next.clone());
    for _ in 0..self.lk_levels {
      let last = self.levels0.len() - 1;
      let w = (self.levels0[last].width + 1) / 2;
      let h = (self.levels0[last].height + 1) / 2;
      if usize::min(w, h) < MIN_LEVEL_SIZE { break }
      let mut l0 = Image::new(w, h);
      let mut l1 = Image::new(w, h);
      self.levels0[last].resize_into(&mut l0);
      self.levels1[last].resize_into(&mut l1);
      self.levels0.push(l0);
      self.levels1.push(l1);
    }
  }

  // Iterates the displacement of one pixel starting from `guess`. The guess
  // from the coarser level is replaced by zero when zero fits the window at
  // least as well. Updates longer than the window are not trusted.
  fn track_pixel(&self, level: &Level, x: usize, y: usize, guess: Vector2d) -> Vector2d {
    let r = (self.lk_win_size - 1) / 2;
    let max_step = self.lk_win_size as f64;
    let mut d = guess;
    let mut sums = level.window_sums(x, y, r, &d);
    if d != Vector2d::zeros() {
      let still = level.window_sums(x, y, r, &Vector2d::zeros());
      if still.mean_error() <= sums.mean_error() {
        d = Vector2d::zeros();
        sums = still;
      }
    }
    for iteration in 0..self.lk_iters {
      if iteration > 0 {
        sums = level.window_sums(x, y, r, &d);
      }
      let step = match sums.step() {
        Some(step) => step,
        None => break,
      };
      let length = step.norm();
      if !(length <= max_step) { break }
      d += step;
      if length < MIN_STEP { break }
    }
    d
  }

  #[allow(non_snake_case)]
  fn process_level(&self, I0: &Image, I1: &Image, flow: &mut FlowField) {
    let level = Level::new(I0, I1);
    for y in 0..I0.height {
      for x in 0..I0.width {
        let i = y * I0.width + x;
        let guess = Vector2d::new(flow.x[i] as f64, flow.y[i] as f64);
        let d = self.track_pixel(&level, x, y, guess);
        flow.x[i] = d[0] as f32;
        flow.y[i] = d[1] as f32;
      }
    }
  }
}

impl DenseFlow for LucasKanadeFlow {
  fn compute(&mut self, prev: &Image, next: &Image, flow: &mut FlowField) -> Result<()> {
    if prev.width != next.width || prev.height != next.height {
      bail!("Optical flow inputs differ in size: {}x{} and {}x{}.",
        prev.width, prev.height, next.width, next.height);
    }
    if prev.is_empty() {
      bail!("Optical flow input is empty.");
    }
    self.build_levels(prev, next);

    let mut coarse = std::mem::take(&mut self.coarse);
    for level in (0..self.levels0.len()).rev() {
      let (w, h) = (self.levels0[level].width, self.levels0[level].height);
      flow.reset(w, h);
      if level + 1 < self.levels0.len() {
        // Initial guess from the coarser level.
        for y in 0..h {
          for x in 0..w {
            let cx = usize::min(x / 2, coarse.width - 1);
            let cy = usize::min(y / 2, coarse.height - 1);
            let c = cy * coarse.width + cx;
            flow.x[y * w + x] = 2. * coarse.x[c];
            flow.y[y * w + x] = 2. * coarse.y[c];
          }
        }
      }
      self.process_level(&self.levels0[level], &self.levels1[level], flow);
      if level > 0 {
        coarse.clone_from(flow);
      }
    }
    self.coarse = coarse;
    Ok(())
  }
}

// Scharr derivative with replicated borders.
#[allow(non_snake_case)]
fn scharr(image: &Image) -> (Vec<f32>, Vec<f32>) {
  let w = image.width;
  let h = image.height;
  let mut Ix = vec![0f32; w * h];
  let mut Iy = vec![0f32; w * h];
  for y in 0..h as i64 {
    for x in 0..w as i64 {
      let v = |dx: i64, dy: i64| image.value_clamped(x + dx, y + dy) as f32;
      let i = y as usize * w + x as usize;
      Ix[i] = (10. * v(1, 0) + 3. * v(1, 1) + 3. * v(1, -1)
        - 10. * v(-1, 0) - 3. * v(-1, 1) - 3. * v(-1, -1)) / 32.;
      Iy[i] = (10. * v(0, 1) + 3. * v(1, 1) + 3. * v(-1, 1)
        - 10. * v(0, -1) - 3. * v(1, -1) - 3. * v(-1, -1)) / 32.;
    }
  }
  (Ix, Iy)
}
