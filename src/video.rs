use crate::all::*;

use std::process::{Child, ChildStdout, Command, Stdio};

// Ordered frames of one stream, `None` at the end.
pub trait FrameSource {
  fn next_frame(&mut self) -> Result<Option<&Image>>;
  // Number of frames when known in advance.
  fn len(&self) -> Option<usize>;
}

// Decodes a video file with an `ffmpeg` child process.
pub struct VideoInput {
  child: Child,
  child_stdout: ChildStdout,
  width: usize,
  height: usize,
  frame_count: Option<usize>,
  rgb: Vec<u8>,
  frame: Image,
}

impl VideoInput {
  pub fn new(path: &Path) -> Result<VideoInput> {
    let path_str = path.to_str().ok_or(anyhow!("Failed to parse video path."))?;
    if !path.exists() {
      bail!("Video file {} does not exist.", path_str);
    }
    let (width, height, frame_count) = probe(path_str)?;
    let mut child = Command::new("ffmpeg")
      .args(["-v", "error", "-i", path_str, "-f", "rawvideo", "-vcodec", "rawvideo",
        "-vsync", "passthrough", "-pix_fmt", "rgb24", "-"])
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .spawn()
      .context("Failed to start ffmpeg.")?;
    let child_stdout = child.stdout.take().ok_or(anyhow!("Missing ffmpeg output pipe."))?;
    info!("Opened {}: {}x{}, {} frames.", path_str, width, height,
      frame_count.map_or("unknown".to_string(), |n| n.to_string()));
    Ok(VideoInput {
      child,
      child_stdout,
      width,
      height,
      frame_count,
      rgb: vec![],
      frame: Image::empty(),
    })
  }
}

impl FrameSource for VideoInput {
  fn next_frame(&mut self) -> Result<Option<&Image>> {
    let n = self.width * self.height * 3;
    if self.rgb.len() != n {
      self.rgb.resize(n, 0);
    }
    let read = read_full(&mut self.child_stdout, &mut self.rgb)
      .context("Reading bytes from video input failed.")?;
    if read == 0 { return Ok(None) }
    if read < n {
      bail!("Video input ended in the middle of a frame ({} of {} bytes).", read, n);
    }
    self.frame.set_from_rgb(self.width, self.height, &self.rgb);
    Ok(Some(&self.frame))
  }

  fn len(&self) -> Option<usize> {
    self.frame_count
  }
}

impl Drop for VideoInput {
  fn drop(&mut self) {
    // The decoder may still be running if the stream was not read to the end.
    let _ = self.child.kill();
    let _ = self.child.wait();
  }
}

// Like `read_exact()`, but a clean end of stream is not an error.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
  let mut total = 0;
  while total < buf.len() {
    match reader.read(&mut buf[total..]) {
      Ok(0) => break,
      Ok(k) => total += k,
      Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
      Err(e) => return Err(e),
    }
  }
  Ok(total)
}

// Frame size and packet count of the first video stream.
fn probe(path: &str) -> Result<(usize, usize, Option<usize>)> {
  let output = Command::new("ffprobe")
    .args(["-v", "error", "-select_streams", "v:0", "-count_packets",
      "-show_entries", "stream=width,height,nb_read_packets", "-of", "csv=p=0", path])
    .output()
    .context("Failed to run ffprobe.")?;
  if !output.status.success() {
    bail!("ffprobe failed on {}: {}", path, String::from_utf8_lossy(&output.stderr).trim());
  }
  parse_probe(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe(text: &str) -> Result<(usize, usize, Option<usize>)> {
  let line = text.lines().next().ok_or(anyhow!("Empty ffprobe output."))?;
  let fields: Vec<&str> = line.trim().split(',').collect();
  if fields.len() < 2 {
    bail!("Unexpected ffprobe output: {}", line);
  }
  let width = fields[0].parse::<usize>().context(format!("Bad video width: {}", fields[0]))?;
  let height = fields[1].parse::<usize>().context(format!("Bad video height: {}", fields[1]))?;
  if width == 0 || height == 0 {
    bail!("Video has zero size {}x{}.", width, height);
  }
  let frame_count = fields.get(2).and_then(|f| f.parse::<usize>().ok());
  Ok((width, height, frame_count))
}
