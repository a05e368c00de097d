use crate::all::*;

// Removes the estimated camera motion from the dense flow. The current frame
// is warped back onto the previous one, so flow between the previous pyramid
// and the warped pyramid only contains what the homography does not explain.
pub struct Stabilizer {
  warped: Image,
  pyramid: Pyramid,
}

impl Stabilizer {
  pub fn new(scale_set: &ScaleSet) -> Stabilizer {
    Stabilizer {
      warped: Image::empty(),
      pyramid: Pyramid::new(scale_set),
    }
  }

  pub fn stabilize(
    &mut self,
    h: &Matrix3d,
    prev: &Pyramid,
    curr: &Image,
    kernels: &mut Kernels,
    stabilized: &mut [FlowField],
  ) -> Result<()> {
    assert_eq!(stabilized.len(), prev.len());
    let h_inv = match h.try_inverse() {
      Some(h_inv) => h_inv,
      None => {
        warn!("Camera motion homography is not invertible, skipping stabilization.");
        Matrix3d::identity()
      },
    };
    // dst(x) = curr(H x)
    kernels.warp.warp(curr, &h_inv, &mut self.warped)?;
    self.pyramid.build(&self.warped)?;
    for (i, flow) in stabilized.iter_mut().enumerate() {
      kernels.flow.compute(&prev.levels[i], &self.pyramid.levels[i], flow)
        .context(format!("Stabilized flow failed on scale {}.", i))?;
    }
    Ok(())
  }
}
