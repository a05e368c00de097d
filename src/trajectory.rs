// Tests deciding whether a completed track is reported, and the text record
// of a reported trajectory.

use crate::all::*;

// Frame size and the number of frames the temporal coordinate is relative to.
#[derive(Clone, Copy, Debug)]
pub struct SequenceInfo {
  pub width: usize,
  pub height: usize,
  pub length: usize,
  pub start_frame: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrajectoryStats {
  pub mean: Vector2d,
  // Population standard deviation per axis.
  pub spread: Vector2d,
  pub length: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
  Static,
  Erratic,
  Jump,
  CameraMotion,
}

#[derive(Clone, Debug)]
pub struct TrajectoryRecord {
  pub frame_index: usize,
  pub stats: TrajectoryStats,
  pub scale: f64,
  pub normalized: [f64; 3],
  pub displacements: Vec<Vector2d>,
}

pub struct TrajectoryFilter {
  min_var: f64,
  max_var: f64,
  max_dis: f64,
  max_path_ratio: f64,
  tolerance: f64,
  static_fraction: f64,
}

impl TrajectoryFilter {
  pub fn new(p: &ParameterSet) -> TrajectoryFilter {
    TrajectoryFilter {
      min_var: p.min_var,
      max_var: p.max_var,
      max_dis: p.max_dis,
      max_path_ratio: p.max_path_ratio,
      tolerance: p.camera_motion_tolerance,
      static_fraction: p.static_fraction,
    }
  }

  pub fn is_valid(&self, points: &[Vector2d]) -> std::result::Result<TrajectoryStats, Rejection> {
    assert!(points.len() >= 2);
    let n = points.len() as f64;
    let mean = points.iter().sum::<Vector2d>() / n;
    let variance = points.iter()
      .map(|p| (p - mean).component_mul(&(p - mean)))
      .sum::<Vector2d>() / n;
    let spread = variance.map(|v| v.sqrt());
    if spread[0] < self.min_var && spread[1] < self.min_var {
      return Err(Rejection::Static);
    }
    if spread[0] > self.max_var || spread[1] > self.max_var {
      return Err(Rejection::Erratic);
    }

    let mut length = 0.;
    let mut max_step: f64 = 0.;
    for w in points.windows(2) {
      let step = (w[1] - w[0]).norm();
      length += step;
      max_step = max_step.max(step);
    }
    let mut min = points[0];
    let mut max = points[0];
    for p in points {
      min = min.inf(p);
      max = max.sup(p);
    }
    if length > self.max_path_ratio * (max - min).norm() {
      return Err(Rejection::Erratic);
    }
    if max_step > self.max_dis && max_step > 0.7 * length {
      return Err(Rejection::Jump);
    }
    Ok(TrajectoryStats { mean, spread, length })
  }

  // Rejects residual motion that is near zero for too many steps. Accepted
  // displacements are normalized by their total magnitude.
  pub fn is_camera_motion(&self, displacements: &mut [Vector2d]) -> std::result::Result<(), Rejection> {
    if displacements.is_empty() { return Err(Rejection::CameraMotion) }
    let still = displacements.iter().filter(|d| d.norm() <= self.tolerance).count();
    if still as f64 >= self.static_fraction * displacements.len() as f64 {
      return Err(Rejection::CameraMotion);
    }
    let sum: f64 = displacements.iter().map(|d| d.norm()).sum();
    if sum <= 0. { return Err(Rejection::CameraMotion) }
    displacements.iter_mut().for_each(|d| *d /= sum);
    Ok(())
  }

  // Positions and displacements are rescaled to frame coordinates first.
  pub fn evaluate(
    &self,
    track: &Track,
    scale: f64,
    frame_index: usize,
    track_length: usize,
    sequence: &SequenceInfo,
  ) -> std::result::Result<TrajectoryRecord, Rejection> {
    let points: Vec<Vector2d> = track.points.as_slice().iter().map(|p| p * scale).collect();
    let mut displacements: Vec<Vector2d> = track.displacements.as_slice().iter().map(|d| d * scale).collect();
    let stats = self.is_valid(&points)?;
    self.is_camera_motion(&mut displacements)?;
    let t = frame_index as f64 - track_length as f64 / 2. - sequence.start_frame as f64;
    let normalized = [
      stats.mean[0] / sequence.width as f64,
      stats.mean[1] / sequence.height as f64,
      t / sequence.length as f64,
    ].map(|v| v.clamp(0., 0.999));
    Ok(TrajectoryRecord {
      frame_index,
      stats,
      scale,
      normalized,
      displacements,
    })
  }
}

impl TrajectoryRecord {
  // Tab separated, every field followed by a tab, then the descriptor.
  pub fn write(&self, descriptor: &dyn DescriptorAccumulator, out: &mut String) {
    let s = &self.stats;
    out.push_str(&format!("{}\t", self.frame_index));
    let values = [s.mean[0], s.mean[1], s.spread[0], s.spread[1], s.length, self.scale].into_iter()
      .chain(self.normalized)
      .chain(self.displacements.iter().flat_map(|d| [d[0], d[1]]));
    for v in values {
      out.push_str(&format!("{:.6}\t", v));
    }
    descriptor.write(out);
    out.push('\n');
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn points(v: &[[f64; 2]]) -> Vec<Vector2d> {
    v.iter().map(|p| Vector2d::new(p[0], p[1])).collect()
  }

  fn filter() -> TrajectoryFilter {
    TrajectoryFilter::new(&ParameterSet::default())
  }

  #[test]
  fn test_static_is_rejected() {
    let p = points(&[[10., 10.], [10.5, 10.], [11., 10.2]]);
    assert_eq!(filter().is_valid(&p), Err(Rejection::Static));
  }

  #[test]
  fn test_straight_line_is_valid() {
    let p = points(&[[0., 0.], [3., 0.], [6., 0.], [9., 0.]]);
    let stats = filter().is_valid(&p).unwrap();
    assert_eq!(stats.mean, Vector2d::new(4.5, 0.));
    assert!((stats.spread[0] - 11.25f64.sqrt()).abs() < 1e-12);
    assert_eq!(stats.spread[1], 0.);
    assert_eq!(stats.length, 9.);
  }

  #[test]
  fn test_erratic_and_jump() {
    // Spread over the limit.
    let p = points(&[[0., 0.], [120., 0.], [240., 0.]]);
    assert_eq!(filter().is_valid(&p), Err(Rejection::Erratic));

    // Back and forth: long path inside a small box.
    let mut zigzag = vec![];
    for i in 0..30 {
      zigzag.push([if i % 2 == 0 { 0. } else { 5. }, 0.]);
    }
    assert_eq!(filter().is_valid(&points(&zigzag)), Err(Rejection::Erratic));

    // One big step dominating the path.
    let p = points(&[[0., 0.], [1., 0.], [2., 0.], [30., 0.]]);
    assert_eq!(filter().is_valid(&p), Err(Rejection::Jump));
  }

  #[test]
  fn test_camera_motion() {
    let f = filter();
    let mut still = points(&[[0.5, 0.], [0., -1.], [0.2, 0.2]]);
    assert_eq!(f.is_camera_motion(&mut still), Err(Rejection::CameraMotion));

    let mut moving = points(&[[3., 4.], [0., 0.5], [0., 4.5]]);
    f.is_camera_motion(&mut moving).unwrap();
    assert_eq!(moving[0], Vector2d::new(0.3, 0.4));
    assert_eq!(moving[2], Vector2d::new(0., 0.45));

    let mut p = ParameterSet::default();
    p.static_fraction = 0.5;
    let strict = TrajectoryFilter::new(&p);
    let mut half = points(&[[3., 4.], [0., 0.5], [0., 0.1], [2., 0.]]);
    assert_eq!(strict.is_camera_motion(&mut half), Err(Rejection::CameraMotion));
  }

  #[test]
  fn test_evaluate_and_record() {
    let info = TrackInfo::new(2, 1).unwrap();
    let mut track = Track::new(Vector2d::new(10., 20.), &info, Box::new(NoDescriptor));
    track.advance(Vector2d::new(12., 20.), Vector2d::new(2., 0.));
    track.advance(Vector2d::new(14., 20.), Vector2d::new(0., 2.));
    let sequence = SequenceInfo { width: 100, height: 50, length: 10, start_frame: 0 };
    let record = filter().evaluate(&track, 2., 6, 2, &sequence).unwrap();
    assert_eq!(record.stats.mean, Vector2d::new(24., 40.));
    assert_eq!(record.stats.length, 8.);
    assert_eq!(record.displacements, points(&[[0.5, 0.], [0., 0.5]]));
    assert!((record.normalized[0] - 0.24).abs() < 1e-12);
    assert!((record.normalized[1] - 0.8).abs() < 1e-12);
    assert!((record.normalized[2] - 0.5).abs() < 1e-12);

    let mut out = String::new();
    record.write(&NoDescriptor, &mut out);
    let fields: Vec<&str> = out.split('\t').collect();
    assert_eq!(fields.len(), 10 + 2 * 2 + 1);
    assert_eq!(fields[0], "6");
    assert_eq!(fields[1], "24.000000");
    assert_eq!(fields[6], "2.000000");
    assert_eq!(fields[9], "0.500000");
    assert_eq!(fields[10], "0.500000");
    assert_eq!(*fields.last().unwrap(), "\n");
  }

  #[test]
  fn test_normalized_coordinates_are_clamped() {
    let info = TrackInfo::new(2, 1).unwrap();
    let mut track = Track::new(Vector2d::new(90., 5.), &info, Box::new(NoDescriptor));
    track.advance(Vector2d::new(95., 5.), Vector2d::new(5., 0.));
    track.advance(Vector2d::new(100., 5.), Vector2d::new(5., 0.));
    let sequence = SequenceInfo { width: 50, height: 50, length: 100, start_frame: 40 };
    let record = filter().evaluate(&track, 1., 2, 2, &sequence).unwrap();
    assert_eq!(record.normalized, [0.999, 0.1, 0.]);
  }
}
