mod all;
mod corner;
mod correspondence;
mod descriptor;
mod detector;
mod extractor;
mod homography;
mod image;
mod kernels;
mod mask;
mod matcher;
mod motion;
mod optical_flow;
mod parameters;
mod pyramid;
mod sampler;
mod stabilizer;
mod stepper;
mod track;
mod trajectory;
mod types;
mod util;
mod video;
mod warp;

#[cfg(test)]
mod test_util;

use all::*;

use clap::Parser;

#[derive(Parser)]
#[clap(about = "Extract camera motion stabilized dense trajectories from a video.")]
struct Args {
  // Video file to decode.
  video: String,
  #[clap(flatten)]
  params: ParameterSet,
}

fn handle_error(err: &anyhow::Error) {
  eprintln!("Error:");
  for (i, e) in err.chain().enumerate() {
    eprintln!("  {}: {}", i + 1, e);
  }
}

fn main() {
  if let Err(err) = run() {
    handle_error(&err);
    std::process::exit(1);
  }
}

fn run() -> Result<()> {
  let args = Args::parse();
  util::setup_logging();
  let params = args.params;
  params.validate()?;

  let mut input = VideoInput::new(Path::new(&args.video))?;
  let source_length = input.len();

  let boxes = match &params.bb_file {
    Some(bb_file) => {
      let boxes = BoxList::load(Path::new(bb_file))?;
      boxes.check_length(source_length)?;
      Some(boxes)
    },
    None => None,
  };
  let sequence_length = params.sequence_length(source_length)?;

  let kernels = Kernels::reference(&params)?;
  let mut extractor = Extractor::new(&params, kernels, boxes, sequence_length)?;
  let stdout = std::io::stdout();
  let mut out = std::io::BufWriter::new(stdout.lock());
  extractor::run(&mut input, &mut extractor, &mut out)?;
  Ok(())
}
