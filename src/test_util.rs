// Deterministic synthetic frames for tests.

use crate::all::*;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

pub fn random_image(width: usize, height: usize, seed: u64) -> Image {
  let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
  let data = (0..width * height).map(|_| rng.gen::<u8>()).collect();
  Image { data, width, height }
}

// Random blocks smoothed so that gradients are well defined for flow.
pub fn textured_image(width: usize, height: usize, seed: u64) -> Image {
  let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
  let block = 4;
  let cols = width / block + 1;
  let rows = height / block + 1;
  let values: Vec<u8> = (0..cols * rows).map(|_| rng.gen_range(20..236)).collect();
  let mut image = Image::new(width, height);
  for y in 0..height {
    for x in 0..width {
      image.set_value(x, y, values[(y / block) * cols + x / block]);
    }
  }
  image.box_blur(1)
}

pub fn crop(image: &Image, ax: usize, ay: usize, width: usize, height: usize) -> Image {
  let mut out = Image::new(width, height);
  for y in 0..height {
    for x in 0..width {
      out.set_value(x, y, image.value(ax + x, ay + y));
    }
  }
  out
}

// Frames of a camera panning so that scene content moves by `step` pixels
// per frame.
pub fn panning_frames(width: usize, height: usize, step: [usize; 2], count: usize, seed: u64) -> Vec<Image> {
  let margin = [step[0] * count + 1, step[1] * count + 1];
  let scene = textured_image(width + margin[0], height + margin[1], seed);
  (0..count)
    .map(|k| crop(&scene, margin[0] - k * step[0], margin[1] - k * step[1], width, height))
    .collect()
}

// Flow field that is the same vector everywhere.
pub fn uniform_flow(width: usize, height: usize, v: [f32; 2]) -> FlowField {
  let mut flow = FlowField::new(width, height);
  flow.x.iter_mut().for_each(|x| *x = v[0]);
  flow.y.iter_mut().for_each(|y| *y = v[1]);
  flow
}

// Exact flow for frames that differ by an integer translation: searches the
// shift minimizing the absolute difference over the image interior and
// reports it for every pixel.
pub struct TranslationSearchFlow {
  radius: i64,
}

impl TranslationSearchFlow {
  pub fn new(radius: usize) -> TranslationSearchFlow {
    TranslationSearchFlow { radius: radius as i64 }
  }
}

impl DenseFlow for TranslationSearchFlow {
  fn compute(&mut self, prev: &Image, next: &Image, flow: &mut FlowField) -> Result<()> {
    let r = self.radius;
    let m = r + 1;
    let (w, h) = (prev.width as i64, prev.height as i64);
    let mut best = (u64::MAX, [0, 0]);
    if w > 2 * m && h > 2 * m {
      for dy in -r..=r {
        for dx in -r..=r {
          let mut sad = 0u64;
          for y in m..(h - m) {
            for x in m..(w - m) {
              let a = prev.value(x as usize, y as usize) as i64;
              let b = next.value((x + dx) as usize, (y + dy) as usize) as i64;
              sad += (a - b).unsigned_abs();
            }
          }
          if sad < best.0 {
            best = (sad, [dx, dy]);
          }
        }
      }
    }
    flow.reset(prev.width, prev.height);
    flow.x.iter_mut().for_each(|v| *v = best.1[0] as f32);
    flow.y.iter_mut().for_each(|v| *v = best.1[1] as f32);
    Ok(())
  }
}

// Frames held in memory.
pub struct MemorySource {
  frames: Vec<Image>,
  next: usize,
}

impl MemorySource {
  pub fn new(frames: Vec<Image>) -> MemorySource {
    MemorySource { frames, next: 0 }
  }
}

impl FrameSource for MemorySource {
  fn next_frame(&mut self) -> Result<Option<&Image>> {
    if self.next >= self.frames.len() { return Ok(None) }
    self.next += 1;
    Ok(Some(&self.frames[self.next - 1]))
  }

  fn len(&self) -> Option<usize> {
    Some(self.frames.len())
  }
}
