use crate::all::*;

// The numeric kernels the pipeline calls, one blocking call per use. Any of
// them can be replaced by another implementation of the same trait.
pub struct Kernels {
  pub flow: Box<dyn DenseFlow>,
  pub detector: Box<dyn FeatureDetector>,
  pub matcher: Box<dyn FeatureMatcher>,
  pub homography: Box<dyn HomographySolver>,
  pub warp: Box<dyn PerspectiveWarp>,
  pub descriptor: DescriptorFactory,
}

impl Kernels {
  // CPU implementations shipped with the crate.
  pub fn reference(p: &ParameterSet) -> Result<Kernels> {
    Ok(Kernels {
      flow: Box::new(LucasKanadeFlow::new(p)?),
      detector: Box::new(Detector::new(p)),
      matcher: Box::new(WindowedMatcher::new(p)),
      homography: Box::new(RansacHomography::new(p)),
      warp: Box::new(BilinearWarp),
      descriptor: no_descriptor_factory(),
    })
  }
}
