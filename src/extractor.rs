use crate::all::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
  // Outside the frame range or out of order.
  Skipped,
  // First processed frame: tracks are sampled, no flow is computed.
  Bootstrap,
  Tracked,
}

#[derive(Clone, Debug)]
pub struct FrameReport {
  pub kind: FrameKind,
  // Live tracks over all scales after the frame.
  pub live: usize,
  pub stats: StepStats,
  pub motion: Option<MotionEstimate>,
}

impl FrameReport {
  fn skipped() -> FrameReport {
    FrameReport {
      kind: FrameKind::Skipped,
      live: 0,
      stats: StepStats::default(),
      motion: None,
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunTotals {
  pub frames: usize,
  pub stats: StepStats,
}

// Buffers sized from the first processed frame and reused for the rest of
// the stream. Previous and current buffers are swapped after every frame.
struct StreamState {
  scale_set: ScaleSet,
  sequence: SequenceInfo,
  prev: Pyramid,
  curr: Pyramid,
  tracks: Vec<Vec<Track>>,
  flows: Vec<FlowField>,
  stabilized: Vec<FlowField>,
  prev_mask: Image,
  curr_mask: Image,
  prev_features: Features,
  curr_features: Features,
  flow_matches: Correspondences,
  feature_matches: Correspondences,
  matches: Correspondences,
  stabilizer: Stabilizer,
  refill_counter: usize,
}

pub struct Extractor {
  params: ParameterSet,
  info: TrackInfo,
  kernels: Kernels,
  sampler: DenseSampler,
  estimator: MotionEstimator,
  filter: TrajectoryFilter,
  boxes: Option<BoxList>,
  sequence_length: usize,
  state: Option<StreamState>,
  last_frame: Option<usize>,
  totals: RunTotals,
}

impl Extractor {
  // `sequence_length` is the frame count the temporal coordinate is relative to.
  pub fn new(
    params: &ParameterSet,
    kernels: Kernels,
    boxes: Option<BoxList>,
    sequence_length: usize,
  ) -> Result<Extractor> {
    params.validate()?;
    if sequence_length == 0 {
      bail!("Sequence length must be positive.");
    }
    Ok(Extractor {
      params: params.clone(),
      info: TrackInfo::new(params.track_length, params.init_gap)?,
      kernels,
      sampler: DenseSampler::new(params),
      estimator: MotionEstimator::new(params),
      filter: TrajectoryFilter::new(params),
      boxes,
      sequence_length,
      state: None,
      last_frame: None,
      totals: RunTotals::default(),
    })
  }

  // Emitted trajectory records are written to `out`.
  pub fn process(&mut self, frame_index: usize, frame: &Image, out: &mut dyn Write) -> Result<FrameReport> {
    if let Some(last_frame) = self.last_frame {
      if frame_index <= last_frame {
        warn!("Ignoring unordered/duplicated frame {}.", frame_index);
        return Ok(FrameReport::skipped());
      }
    }
    self.last_frame = Some(frame_index);
    if !self.params.in_range(frame_index) {
      return Ok(FrameReport::skipped());
    }
    self.totals.frames += 1;

    let report = if self.state.is_none() {
      self.bootstrap(frame_index, frame)?
    }
    else {
      self.track(frame_index, frame, out)?
    };
    self.totals.stats.add(&report.stats);
    Ok(report)
  }

  fn fill_mask(&self, frame_index: usize, mask: &mut Image, width: usize, height: usize) {
    if mask.width != width || mask.height != height {
      *mask = Image::filled(width, height, 1);
    }
    let boxes = self.boxes.as_ref().map_or(&[][..], |b| b.boxes(frame_index));
    fill_mask(mask, boxes);
  }

  fn bootstrap(&mut self, frame_index: usize, frame: &Image) -> Result<FrameReport> {
    let scale_set = ScaleSet::new(frame.width, frame.height, &self.params)
      .context("Failed to set up the scale pyramid.")?;
    info!("Tracking {} scales on {}x{} frames from frame {}.",
      scale_set.len(), frame.width, frame.height, frame_index);
    let mut curr = Pyramid::new(&scale_set);
    curr.build(frame)?;

    let mut tracks = vec![];
    for level in &curr.levels {
      let points = self.sampler.sample(level, &[]);
      tracks.push(points.into_iter()
        .map(|p| Track::new(p, &self.info, (self.kernels.descriptor)()))
        .collect::<Vec<_>>());
    }

    let mut curr_mask = Image::empty();
    self.fill_mask(frame_index, &mut curr_mask, frame.width, frame.height);
    let mut curr_features = Features::default();
    self.kernels.detector.detect(&curr.levels[0], &curr_mask, &mut curr_features)?;

    let n = scale_set.len();
    let mut state = StreamState {
      sequence: SequenceInfo {
        width: frame.width,
        height: frame.height,
        length: self.sequence_length,
        start_frame: self.params.start_frame,
      },
      prev: Pyramid::new(&scale_set),
      curr,
      tracks,
      flows: vec![FlowField::default(); n],
      stabilized: vec![FlowField::default(); n],
      prev_mask: Image::empty(),
      curr_mask,
      prev_features: Features::default(),
      curr_features,
      flow_matches: Correspondences::default(),
      feature_matches: Correspondences::default(),
      matches: Correspondences::default(),
      stabilizer: Stabilizer::new(&scale_set),
      refill_counter: 0,
      scale_set,
    };
    state.swap_buffers();
    let live = state.live();
    self.state = Some(state);
    Ok(FrameReport {
      kind: FrameKind::Bootstrap,
      live,
      stats: StepStats::default(),
      motion: None,
    })
  }

  fn track(&mut self, frame_index: usize, frame: &Image, out: &mut dyn Write) -> Result<FrameReport> {
    let mut state = self.state.take().ok_or(anyhow!("Tracking before bootstrap."))?;
    let result = self.track_state(&mut state, frame_index, frame, out);
    self.state = Some(state);
    result
  }

  fn track_state(
    &mut self,
    state: &mut StreamState,
    frame_index: usize,
    frame: &Image,
    out: &mut dyn Write,
  ) -> Result<FrameReport> {
    state.curr.build(frame).context(format!("Frame {} differs in size from the first frame.", frame_index))?;
    self.fill_mask(frame_index, &mut state.curr_mask, frame.width, frame.height);
    let kernels = &mut self.kernels;

    // Camera motion from sparse features and the scale 0 flow.
    kernels.detector.detect(&state.curr.levels[0], &state.curr_mask, &mut state.curr_features)?;
    kernels.matcher.match_features(&state.prev_features, &state.curr_features, &mut state.feature_matches);
    for (i, flow) in state.flows.iter_mut().enumerate() {
      kernels.flow.compute(&state.prev.levels[i], &state.curr.levels[i], flow)
        .context(format!("Optical flow failed on scale {}.", i))?;
    }
    match_from_flow(&state.flows[0], &state.prev_mask, self.params.flow_match_stride, &mut state.flow_matches);
    state.matches.merge(&state.flow_matches, &state.feature_matches);
    let motion = self.estimator.estimate(&state.matches, kernels.homography.as_mut());
    state.stabilizer.stabilize(&motion.h, &state.prev, &state.curr.levels[0], kernels, &mut state.stabilized)?;

    let mut stats = StepStats::default();
    let mut text = String::new();
    for i in 0..state.scale_set.len() {
      let ctx = StepContext {
        flow: &state.flows[i],
        stabilized: &state.stabilized[i],
        image: &state.curr.levels[i],
        scale: state.scale_set.scales[i],
        frame_index,
        info: &self.info,
        sequence: &state.sequence,
        filter: &self.filter,
      };
      let tracks = std::mem::take(&mut state.tracks[i]);
      state.tracks[i] = step_tracks(tracks, &ctx, &mut text, &mut stats);
    }
    out.write_all(text.as_bytes()).context("Failed to write trajectories.")?;

    state.refill_counter += 1;
    if state.refill_counter == self.info.gap {
      state.refill_counter = 0;
      for i in 0..state.scale_set.len() {
        let occupied: Vec<Vector2d> = state.tracks[i].iter().map(|t| t.position()).collect();
        let points = self.sampler.sample(&state.curr.levels[i], &occupied);
        debug!("Scale {}: {} live tracks, {} new.", i, occupied.len(), points.len());
        let descriptor = &self.kernels.descriptor;
        state.tracks[i].extend(points.into_iter().map(|p| Track::new(p, &self.info, descriptor())));
      }
    }

    state.swap_buffers();
    Ok(FrameReport {
      kind: FrameKind::Tracked,
      live: state.live(),
      stats,
      motion: Some(motion),
    })
  }

  pub fn finish(&self) -> RunTotals {
    let t = self.totals;
    info!("Processed {} frames, emitted {} trajectories, discarded {} tracks ({} left the frame).",
      t.frames, t.stats.emitted, t.stats.discarded(), t.stats.discarded_bounds);
    t
  }
}

impl StreamState {
  fn swap_buffers(&mut self) {
    std::mem::swap(&mut self.prev, &mut self.curr);
    std::mem::swap(&mut self.prev_mask, &mut self.curr_mask);
    std::mem::swap(&mut self.prev_features, &mut self.curr_features);
  }

  fn live(&self) -> usize {
    self.tracks.iter().map(|t| t.len()).sum()
  }
}

// Feeds every frame of the source through the extractor.
pub fn run(source: &mut dyn FrameSource, extractor: &mut Extractor, out: &mut dyn Write) -> Result<RunTotals> {
  let mut frame_index = 0;
  while let Some(frame) = source.next_frame()? {
    let report = extractor.process(frame_index, frame, out)?;
    if report.kind == FrameKind::Bootstrap {
      debug!("Frame {}: sampled {} tracks.", frame_index, report.live);
    }
    if let Some(motion) = &report.motion {
      debug!("Frame {}: {} matches, {} inliers, {} live tracks.",
        frame_index, motion.match_count, motion.inlier_count, report.live);
    }
    frame_index += 1;
  }
  out.flush().context("Failed to flush output.")?;
  Ok(extractor.finish())
}
