use crate::all::*;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
  pub emitted: usize,
  pub discarded_bounds: usize,
  pub discarded_invalid: usize,
}

impl StepStats {
  pub fn add(&mut self, other: &StepStats) {
    self.emitted += other.emitted;
    self.discarded_bounds += other.discarded_bounds;
    self.discarded_invalid += other.discarded_invalid;
  }

  pub fn discarded(&self) -> usize {
    self.discarded_bounds + self.discarded_invalid
  }
}

// Everything one scale needs to advance its tracks by one frame.
pub struct StepContext<'a> {
  pub flow: &'a FlowField,
  pub stabilized: &'a FlowField,
  // Current frame at this scale.
  pub image: &'a Image,
  pub scale: f64,
  pub frame_index: usize,
  pub info: &'a TrackInfo,
  pub sequence: &'a SequenceInfo,
  pub filter: &'a TrajectoryFilter,
}

enum Outcome {
  Alive(Track),
  Emitted,
  OutOfBounds,
  Rejected,
}

// Consumes the live tracks of a scale and returns the next generation.
// Records of emitted trajectories are appended to `out`.
pub fn step_tracks(tracks: Vec<Track>, ctx: &StepContext, out: &mut String, stats: &mut StepStats) -> Vec<Track> {
  let mut next = Vec::with_capacity(tracks.len());
  for track in tracks {
    match step_track(track, ctx, out) {
      Outcome::Alive(track) => next.push(track),
      Outcome::Emitted => stats.emitted += 1,
      Outcome::OutOfBounds => stats.discarded_bounds += 1,
      Outcome::Rejected => stats.discarded_invalid += 1,
    }
  }
  next
}

fn step_track(mut track: Track, ctx: &StepContext, out: &mut String) -> Outcome {
  let (w, h) = (ctx.image.width, ctx.image.height);
  let p = track.position();
  let [x, y] = clamp_pixel(&p, w, h);
  // Only the raw flow moves the point.
  let q = p + ctx.flow.at(x, y);
  // Written so that a NaN position counts as outside.
  if !(q[0] > 0. && q[0] < w as f64 && q[1] > 0. && q[1] < h as f64) {
    return Outcome::OutOfBounds;
  }
  track.advance(q, ctx.stabilized.at(x, y));
  track.descriptor.update(ctx.image, &q);
  if !track.is_complete() {
    return Outcome::Alive(track);
  }
  match ctx.filter.evaluate(&track, ctx.scale, ctx.frame_index, ctx.info.length, ctx.sequence) {
    Ok(record) => {
      record.write(track.descriptor.as_ref(), out);
      Outcome::Emitted
    },
    Err(_) => Outcome::Rejected,
  }
}
