use crate::all::*;

// Scale geometry fixed once from the first processed frame.
#[derive(Clone, Debug)]
pub struct ScaleSet {
  // Factor that maps level coordinates back to frame coordinates.
  pub scales: Vec<f64>,
  pub sizes: Vec<[usize; 2]>,
}

impl ScaleSet {
  pub fn new(width: usize, height: usize, p: &ParameterSet) -> Result<ScaleSet> {
    if width == 0 || height == 0 {
      bail!("Degenerate frame size {}x{}.", width, height);
    }
    if !(p.scale_stride > 1.) {
      bail!("Scale stride {} would not shrink the pyramid.", p.scale_stride);
    }
    if p.patch_size == 0 {
      bail!("Patch size must be positive.");
    }

    // Number of levels whose shorter side still fits a descriptor patch.
    let mut min_size = usize::min(width, height) as f64;
    let mut layer_count = 0;
    while min_size >= p.patch_size as f64 {
      min_size /= p.scale_stride;
      layer_count += 1;
    }
    let scale_count = usize::min(p.scale_num, usize::max(layer_count, 1));

    let mut scales = vec![1.];
    let mut sizes = vec![[width, height]];
    for i in 1..scale_count {
      let scale = scales[i - 1] * p.scale_stride;
      let w = (width as f64 / scale).round() as usize;
      let h = (height as f64 / scale).round() as usize;
      if w == 0 || h == 0 {
        bail!("Pyramid level {} of a {}x{} frame has degenerate size {}x{}.", i, width, height, w, h);
      }
      scales.push(scale);
      sizes.push([w, h]);
    }
    Ok(ScaleSet { scales, sizes })
  }

  pub fn len(&self) -> usize {
    self.scales.len()
  }
}

// One image per scale, buffers reused frame over frame.
#[derive(Clone)]
pub struct Pyramid {
  pub levels: Vec<Image>,
}

impl Pyramid {
  pub fn new(scale_set: &ScaleSet) -> Pyramid {
    Pyramid {
      levels: scale_set.sizes.iter().map(|s| Image::new(s[0], s[1])).collect(),
    }
  }

  pub fn build(&mut self, image: &Image) -> Result<()> {
    let base = &self.levels[0];
    if image.width != base.width || image.height != base.height {
      bail!("Frame size {}x{} differs from the stream size {}x{}.",
        image.width, image.height, base.width, base.height);
    }
    self.levels[0].copy_from(image);
    for level_ind in 1..self.levels.len() {
      // Borrow the parent non-mutably and the child mutably.
      let (parents, children) = self.levels.split_at_mut(level_ind);
      parents[level_ind - 1].resize_into(&mut children[0]);
    }
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.levels.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_scale_set() {
    let p = ParameterSet::default();
    let s = ScaleSet::new(320, 240, &p).unwrap();
    // 240 / sqrt(2)^k >= 32 holds for k = 0..=5.
    assert_eq!(s.len(), 6);
    assert_eq!(s.sizes[0], [320, 240]);
    assert_eq!(s.sizes[1], [226, 170]);
    assert_eq!(s.sizes[2], [160, 120]);
    assert!((s.scales[2] - 2.).abs() < 1e-6);

    let mut p = ParameterSet::default();
    p.scale_num = 2;
    assert_eq!(ScaleSet::new(320, 240, &p).unwrap().len(), 2);

    // Too small for a patch still keeps the original scale.
    assert_eq!(ScaleSet::new(20, 20, &ParameterSet::default()).unwrap().len(), 1);
  }

  #[test]
  fn test_degenerate_geometry() {
    let p = ParameterSet::default();
    assert!(ScaleSet::new(0, 240, &p).is_err());

    let mut p = ParameterSet::default();
    p.scale_stride = 0.9;
    assert!(ScaleSet::new(320, 240, &p).is_err());

    let mut p = ParameterSet::default();
    p.patch_size = 0;
    assert!(ScaleSet::new(320, 240, &p).is_err());
  }

  #[test]
  fn test_build() {
    let mut p = ParameterSet::default();
    p.scale_num = 3;
    let s = ScaleSet::new(64, 64, &p).unwrap();
    let mut pyramid = Pyramid::new(&s);
    let image = Image::filled(64, 64, 42);
    pyramid.build(&image).unwrap();
    assert_eq!(pyramid.len(), 3);
    assert_eq!(pyramid.levels[0], image);
    assert_eq!(pyramid.levels[2].width, 32);
    assert!(pyramid.levels[2].data.iter().all(|v| *v == 42));
    assert!(pyramid.build(&Image::new(32, 32)).is_err());
  }
}
