// use crate::all::*;

// Eigen-like aliases.
pub type Vector2d = nalgebra::Vector2::<f64>;
pub type Vector3d = nalgebra::Vector3::<f64>;
pub type Matrix3d = nalgebra::Matrix3::<f64>;

// Nearest pixel of a sub-pixel coordinate, clamped inside a `width` x `height`
// raster. Rounds half away from zero like `cvRound` does for positives.
pub fn clamp_pixel(p: &Vector2d, width: usize, height: usize) -> [usize; 2] {
  let x = (p[0].round() as i64).clamp(0, width as i64 - 1);
  let y = (p[1].round() as i64).clamp(0, height as i64 - 1);
  [x as usize, y as usize]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_clamp_pixel() {
    assert_eq!(clamp_pixel(&Vector2d::new(-3.2, 4.4), 10, 8), [0, 4]);
    assert_eq!(clamp_pixel(&Vector2d::new(9.6, 7.5), 10, 8), [9, 7]);
    assert_eq!(clamp_pixel(&Vector2d::new(2.5, 0.49), 10, 8), [3, 0]);
  }
}
