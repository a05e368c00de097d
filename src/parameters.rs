use crate::all::*;

// Built once at startup and passed by reference into every component.
#[derive(Clone, Debug)]
#[derive(clap::Parser)]
pub struct ParameterSet {
  // Trajectories.
  #[clap(long, default_value = "15")]
  pub track_length: usize,
  #[clap(long, default_value = "1")]
  pub init_gap: usize,

  // Spatial pyramid.
  #[clap(long, default_value = "8")]
  pub scale_num: usize,
  #[clap(long, default_value = "1.41421356")]
  pub scale_stride: f64,
  #[clap(long, default_value = "32")]
  pub patch_size: usize,

  // Dense sampling.
  #[clap(long, default_value = "0.001")]
  pub quality: f64,
  #[clap(long, default_value = "5")]
  pub min_distance: usize,

  // Frame range and the optional bounding box mask.
  #[clap(long, default_value = "0")]
  pub start_frame: usize,
  #[clap(long)]
  pub end_frame: Option<usize>,
  #[clap(long)]
  pub bb_file: Option<String>,

  // Camera motion estimation.
  #[clap(long, default_value = "8")]
  pub flow_match_stride: usize,
  #[clap(long, default_value = "50")]
  pub min_match_count: usize,
  #[clap(long, default_value = "25")]
  pub min_inlier_count: usize,
  #[clap(long, default_value = "1.0")]
  pub ransac_threshold: f64,
  #[clap(long, default_value = "2000")]
  pub ransac_iters: usize,
  #[clap(long, default_value = "0")]
  pub ransac_seed: u64,

  // Sparse features.
  #[clap(long, default_value = "25")]
  pub match_window: f64,
  #[clap(long, default_value = "64")]
  pub max_hamming: u32,
  #[clap(long, default_value = "20")]
  pub fast_threshold: i16,
  #[clap(long, default_value = "1000")]
  pub max_features: usize,

  // Dense Lucas-Kanade optical flow.
  #[clap(long, default_value = "3")]
  pub lk_levels: usize,
  #[clap(long, default_value = "3")]
  pub lk_iters: usize,
  #[clap(long, default_value = "5")]
  pub lk_win_size: usize,

  // Trajectory validity.
  #[clap(long, default_value = "1.73205081")]
  pub min_var: f64,
  #[clap(long, default_value = "50")]
  pub max_var: f64,
  #[clap(long, default_value = "20")]
  pub max_dis: f64,
  #[clap(long, default_value = "10")]
  pub max_path_ratio: f64,
  #[clap(long, default_value = "1.0")]
  pub camera_motion_tolerance: f64,
  #[clap(long, default_value = "1.0")]
  pub static_fraction: f64,
}

impl Default for ParameterSet {
  fn default() -> ParameterSet {
    <ParameterSet as clap::Parser>::parse_from(["densetrack"])
  }
}

impl ParameterSet {
  pub fn validate(&self) -> Result<()> {
    if self.track_length < 2 {
      bail!("Trajectory length must be at least 2, got {}.", self.track_length);
    }
    if self.init_gap < 1 {
      bail!("Sampling gap must be at least 1.");
    }
    if self.scale_num < 1 {
      bail!("At least one scale is required.");
    }
    if !(self.scale_stride > 1.) {
      bail!("Scale stride must be larger than 1, got {}.", self.scale_stride);
    }
    if self.patch_size == 0 {
      bail!("Patch size must be positive.");
    }
    if !(self.quality > 0. && self.quality <= 1.) {
      bail!("Sampling quality must be in (0, 1], got {}.", self.quality);
    }
    if self.min_distance == 0 {
      bail!("Minimum sampling distance must be positive.");
    }
    if let Some(end_frame) = self.end_frame {
      if end_frame < self.start_frame {
        bail!("End frame {} precedes start frame {}.", end_frame, self.start_frame);
      }
    }
    if self.flow_match_stride == 0 {
      bail!("Flow match stride must be positive.");
    }
    if self.lk_win_size % 2 != 1 {
      bail!("Lucas-Kanade window size must be odd number.");
    }
    if self.lk_win_size < 3 {
      bail!("Lucas-Kanade window size must be at least 3.");
    }
    if !(self.static_fraction > 0. && self.static_fraction <= 1.) {
      bail!("Static fraction must be in (0, 1], got {}.", self.static_fraction);
    }
    Ok(())
  }

  // Frame count the temporal coordinate of a trajectory is relative to.
  pub fn sequence_length(&self, source_length: Option<usize>) -> Result<usize> {
    match (self.end_frame, source_length) {
      (Some(end_frame), _) => Ok(end_frame - self.start_frame + 1),
      (None, Some(n)) if n > 0 => Ok(n),
      (None, Some(_)) => bail!("Video has no frames."),
      (None, None) => bail!("Video length is unknown, pass --end-frame."),
    }
  }

  pub fn in_range(&self, frame_index: usize) -> bool {
    frame_index >= self.start_frame
      && self.end_frame.map_or(true, |end| frame_index <= end)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let p = ParameterSet::default();
    assert_eq!(p.track_length, 15);
    assert_eq!(p.init_gap, 1);
    assert_eq!(p.scale_num, 8);
    assert!((p.scale_stride - 2f64.sqrt()).abs() < 1e-6);
    assert_eq!(p.min_match_count, 50);
    assert_eq!(p.min_inlier_count, 25);
    assert!(p.end_frame.is_none());
    assert!(p.validate().is_ok());
  }

  #[test]
  fn test_validate() {
    let mut p = ParameterSet::default();
    p.track_length = 1;
    assert!(p.validate().is_err());

    let mut p = ParameterSet::default();
    p.scale_stride = 1.;
    assert!(p.validate().is_err());

    let mut p = ParameterSet::default();
    p.quality = 0.;
    assert!(p.validate().is_err());

    let mut p = ParameterSet::default();
    p.start_frame = 5;
    p.end_frame = Some(4);
    assert!(p.validate().is_err());
  }

  #[test]
  fn test_in_range() {
    let mut p = ParameterSet::default();
    p.start_frame = 2;
    p.end_frame = Some(4);
    assert!(!p.in_range(1));
    assert!(p.in_range(2));
    assert!(p.in_range(4));
    assert!(!p.in_range(5));
    p.end_frame = None;
    assert!(p.in_range(1000));
  }

  #[test]
  fn test_sequence_length() {
    let mut p = ParameterSet::default();
    assert_eq!(p.sequence_length(Some(120)).unwrap(), 120);
    assert!(p.sequence_length(None).is_err());
    assert!(p.sequence_length(Some(0)).is_err());
    p.start_frame = 10;
    p.end_frame = Some(19);
    assert_eq!(p.sequence_length(Some(120)).unwrap(), 10);
    assert_eq!(p.sequence_length(None).unwrap(), 10);
  }
}
