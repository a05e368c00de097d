use crate::all::*;

// Camera motion between consecutive frames in scale 0 pixels.
#[derive(Clone, Debug)]
pub struct MotionEstimate {
  pub h: Matrix3d,
  pub match_count: usize,
  pub inlier_count: usize,
  // False when the identity fallback was used.
  pub accepted: bool,
}

impl MotionEstimate {
  pub fn identity(match_count: usize) -> MotionEstimate {
    MotionEstimate {
      h: Matrix3d::identity(),
      match_count,
      inlier_count: 0,
      accepted: false,
    }
  }
}

pub struct MotionEstimator {
  min_match_count: usize,
  min_inlier_count: usize,
}

impl MotionEstimator {
  pub fn new(p: &ParameterSet) -> MotionEstimator {
    MotionEstimator {
      min_match_count: p.min_match_count,
      min_inlier_count: p.min_inlier_count,
    }
  }

  // Weak estimates fall back to the identity, they are never errors.
  pub fn estimate(
    &self,
    matches: &Correspondences,
    solver: &mut dyn HomographySolver,
  ) -> MotionEstimate {
    let count = matches.len();
    if count <= self.min_match_count {
      debug!("Only {} correspondences, assuming no camera motion.", count);
      return MotionEstimate::identity(count);
    }
    let fit = match solver.find(&matches.prev, &matches.curr) {
      Some(fit) => fit,
      None => {
        debug!("Homography fit failed on {} correspondences.", count);
        return MotionEstimate::identity(count);
      },
    };
    let inlier_count = fit.inlier_count();
    if inlier_count <= self.min_inlier_count {
      debug!("Homography has only {} inliers of {}, ignoring it.", inlier_count, count);
      let mut estimate = MotionEstimate::identity(count);
      estimate.inlier_count = inlier_count;
      return estimate;
    }
    MotionEstimate {
      h: fit.h,
      match_count: count,
      inlier_count,
      accepted: true,
    }
  }
}
