use crate::all::*;

// Row-major grayscale image storage.
// Could also have used nalebgra::DMatrix, but the added complexity
// only seems to help with algorithms like the optical flow.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
}

impl Image {
  pub fn empty() -> Image {
    Image {
      data: vec![],
      width: 0,
      height: 0,
    }
  }

  pub fn new(width: usize, height: usize) -> Image {
    Image {
      data: vec![0; width * height],
      width,
      height,
    }
  }

  pub fn filled(width: usize, height: usize, value: u8) -> Image {
    Image {
      data: vec![value; width * height],
      width,
      height,
    }
  }

  pub fn from_data(width: usize, height: usize, data: Vec<u8>) -> Result<Image> {
    if data.len() != width * height {
      bail!("Image data has {} bytes, expected {}x{}.", data.len(), width, height);
    }
    Ok(Image { data, width, height })
  }

  // Packed 8-bit RGB to luma with the ITU-R BT.601 weights.
  pub fn set_from_rgb(&mut self, width: usize, height: usize, rgb: &[u8]) {
    assert_eq!(rgb.len(), 3 * width * height);
    self.width = width;
    self.height = height;
    self.data.clear();
    self.data.extend(rgb.chunks_exact(3).map(|c| {
      let v = 0.299 * c[0] as f64 + 0.587 * c[1] as f64 + 0.114 * c[2] as f64;
      v.round().min(255.) as u8
    }));
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  #[inline(always)]
  pub fn value(&self, x: usize, y: usize) -> u8 {
    self.data[y * self.width + x]
  }

  #[inline(always)]
  pub fn value_i32(&self, x: i32, y: i32) -> u8 {
    self.data[y as usize * self.width + x as usize]
  }

  #[inline(always)]
  pub fn set_value(&mut self, x: usize, y: usize, value: u8) {
    self.data[y * self.width + x] = value;
  }

  // Replicates the border for coordinates outside the image.
  #[inline(always)]
  pub fn value_clamped(&self, x: i64, y: i64) -> f64 {
    let x = x.clamp(0, self.width as i64 - 1) as usize;
    let y = y.clamp(0, self.height as i64 - 1) as usize;
    self.data[y * self.width + x] as f64
  }

  pub fn bilinear(&self, x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let xa = x - x0;
    let ya = y - y0;
    let x0 = x0 as i64;
    let y0 = y0 as i64;
    // Besides improving computation speed, these keep integer coordinates exact.
    let eps = 1e-5;
    if xa < eps && ya < eps {
      self.value_clamped(x0, y0)
    }
    else if xa < eps {
      (1. - ya) * self.value_clamped(x0, y0) + ya * self.value_clamped(x0, y0 + 1)
    }
    else if ya < eps {
      (1. - xa) * self.value_clamped(x0, y0) + xa * self.value_clamped(x0 + 1, y0)
    }
    else {
      (1. - xa) * (1. - ya) * self.value_clamped(x0, y0)
        + xa * (1. - ya) * self.value_clamped(x0 + 1, y0)
        + (1. - xa) * ya * self.value_clamped(x0, y0 + 1)
        + xa * ya * self.value_clamped(x0 + 1, y0 + 1)
    }
  }

  pub fn copy_from(&mut self, other: &Image) {
    self.width = other.width;
    self.height = other.height;
    self.data.clear();
    self.data.extend_from_slice(&other.data);
  }

  // Bilinear resize into the pre-allocated size of `dst`. Pixel centers are
  // aligned, so `(x + 0.5) * scale - 0.5` maps a destination pixel back.
  pub fn resize_into(&self, dst: &mut Image) {
    assert!(!self.is_empty());
    let sx = self.width as f64 / dst.width as f64;
    let sy = self.height as f64 / dst.height as f64;
    for y in 0..dst.height {
      let v = ((y as f64 + 0.5) * sy - 0.5).max(0.);
      for x in 0..dst.width {
        let u = ((x as f64 + 0.5) * sx - 0.5).max(0.);
        let value = self.bilinear(u, v);
        dst.set_value(x, y, value.round().clamp(0., 255.) as u8);
      }
    }
  }

  // Mean over a (2r+1)^2 window with replicated borders.
  pub fn box_blur(&self, r: usize) -> Image {
    let r = r as i64;
    let n = (2 * r + 1) as f64;
    let mut rows = vec![0f64; self.data.len()];
    for y in 0..self.height {
      for x in 0..self.width {
        let mut sum = 0.;
        for k in -r..=r {
          sum += self.value_clamped(x as i64 + k, y as i64);
        }
        rows[y * self.width + x] = sum / n;
      }
    }
    let mut out = Image::new(self.width, self.height);
    for y in 0..self.height {
      for x in 0..self.width {
        let mut sum = 0.;
        for k in -r..=r {
          let yy = (y as i64 + k).clamp(0, self.height as i64 - 1) as usize;
          sum += rows[yy * self.width + x];
        }
        out.set_value(x, y, (sum / n).round() as u8);
      }
    }
    out
  }
}

// Element access in the manner of `image[y][x]`.
impl Index<usize> for Image {
  type Output = [u8];
  fn index(&self, y: usize) -> &Self::Output {
    &self.data[y * self.width .. (y + 1) * self.width]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bilinear() {
    let image = Image::from_data(3, 2, vec![
      0, 10, 20,
      30, 40, 50,
    ]).unwrap();
    assert_eq!(image.bilinear(1., 1.), 40.);
    assert!((image.bilinear(0.5, 0.) - 5.).abs() < 1e-9);
    assert!((image.bilinear(0.5, 0.5) - 20.).abs() < 1e-9);
    // Border replication.
    assert_eq!(image.bilinear(-4., 7.), 30.);
    assert!((image.bilinear(2.5, 0.) - 20.).abs() < 1e-9);
    assert_eq!(image[1], [30, 40, 50]);
  }

  #[test]
  fn test_resize_into() {
    let mut image = Image::new(8, 6);
    for y in 0..6 {
      for x in 0..8 {
        image.set_value(x, y, 100);
      }
    }
    let mut small = Image::new(4, 3);
    image.resize_into(&mut small);
    assert!(small.data.iter().all(|v| *v == 100));

    let ramp = Image::from_data(4, 1, vec![0, 10, 20, 30]).unwrap();
    let mut half = Image::new(2, 1);
    ramp.resize_into(&mut half);
    assert_eq!(half.data, vec![5, 25]);
  }

  #[test]
  fn test_from_rgb() {
    let mut image = Image::empty();
    image.set_from_rgb(2, 1, &[255, 255, 255, 255, 0, 0]);
    assert_eq!(image.width, 2);
    assert_eq!(image.data, vec![255, 76]);
  }

  #[test]
  fn test_box_blur() {
    let image = Image::filled(5, 4, 7);
    assert_eq!(image.box_blur(2), image);
    let mut spike = Image::new(3, 3);
    spike.set_value(1, 1, 90);
    assert_eq!(spike.box_blur(1).value(1, 1), 10);
  }
}
