// NOTE This kind of import-all file isn't a common Rust idiom.

pub use crate::{
  corner::*,
  correspondence::*,
  descriptor::*,
  detector::*,
  extractor::*,
  homography::*,
  image::*,
  kernels::*,
  mask::*,
  matcher::*,
  motion::*,
  optical_flow::*,
  parameters::*,
  pyramid::*,
  sampler::*,
  stabilizer::*,
  stepper::*,
  track::*,
  trajectory::*,
  types::*,
  video::*,
  warp::*,
};

#[cfg(test)]
pub use crate::test_util::*;

pub use {
  std::{
    fs::File,
    io::{BufRead, BufReader, Read, Write},
    ops::Index,
    path::Path,
  },
  log::{debug, info, warn},
  nalgebra::DMatrix,
  serde::Deserialize,
  anyhow::{anyhow, bail, Context as AnyhowContext, Result},
};
