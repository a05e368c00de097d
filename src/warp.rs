use crate::all::*;

// Perspective warping kernel: `dst(x) = src(m⁻¹ x)`, `dst` gets the size of `src`.
pub trait PerspectiveWarp {
  fn warp(&mut self, src: &Image, m: &Matrix3d, dst: &mut Image) -> Result<()>;
}

// Bilinear sampling, pixels that map outside the source become 0.
pub struct BilinearWarp;

impl PerspectiveWarp for BilinearWarp {
  fn warp(&mut self, src: &Image, m: &Matrix3d, dst: &mut Image) -> Result<()> {
    let inverse = m.try_inverse().ok_or(anyhow!("Warp matrix is singular."))?;
    if dst.width != src.width || dst.height != src.height {
      *dst = Image::new(src.width, src.height);
    }
    let max_x = src.width as f64 - 1.;
    let max_y = src.height as f64 - 1.;
    for y in 0..dst.height {
      for x in 0..dst.width {
        let q = inverse * Vector3d::new(x as f64, y as f64, 1.);
        let value = if q[2].abs() < 1e-12 {
          0.
        }
        else {
          let (u, v) = (q[0] / q[2], q[1] / q[2]);
          if u < 0. || v < 0. || u > max_x || v > max_y { 0. } else { src.bilinear(u, v) }
        };
        dst.set_value(x, y, value.round().clamp(0., 255.) as u8);
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_identity() {
    let src = random_image(20, 10, 1);
    let mut dst = Image::empty();
    BilinearWarp.warp(&src, &Matrix3d::identity(), &mut dst).unwrap();
    assert_eq!(dst, src);
  }

  #[test]
  fn test_translation_and_border() {
    let src = random_image(20, 10, 2);
    let mut m = Matrix3d::identity();
    m[(0, 2)] = 3.;
    m[(1, 2)] = -2.;
    let mut dst = Image::new(20, 10);
    BilinearWarp.warp(&src, &m, &mut dst).unwrap();
    // dst(x, y) = src(x - 3, y + 2)
    assert_eq!(dst.value(5, 1), src.value(2, 3));
    assert_eq!(dst.value(19, 7), src.value(16, 9));
    assert_eq!(dst.value(2, 1), 0);
    assert_eq!(dst.value(10, 8), 0);
  }

  #[test]
  fn test_singular() {
    let src = random_image(4, 4, 3);
    let mut dst = Image::empty();
    assert!(BilinearWarp.warp(&src, &Matrix3d::zeros(), &mut dst).is_err());
  }
}
