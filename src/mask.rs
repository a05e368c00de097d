use crate::all::*;

// Region to exclude from camera motion estimation, typically a detected person.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
  pub top_left: Vector2d,
  pub bottom_right: Vector2d,
  pub confidence: f64,
}

impl BoundingBox {
  fn from_values(v: &[f64]) -> BoundingBox {
    BoundingBox {
      top_left: Vector2d::new(v[0], v[1]),
      bottom_right: Vector2d::new(v[2], v[3]),
      confidence: v[4],
    }
  }
}

#[derive(Deserialize)]
struct BoxRecord {
  frame: usize,
  boxes: Vec<[f64; 5]>,
}

// Boxes of every frame in the order they are listed in the file.
pub struct BoxList {
  pub frames: Vec<Vec<BoundingBox>>,
}

impl BoxList {
  pub fn load(path: &Path) -> Result<BoxList> {
    let file = File::open(path)
      .context(format!("Failed to open bounding box file {}.", path.display()))?;
    let reader = BufReader::new(file);
    let jsonl = matches!(path.extension().and_then(|e| e.to_str()), Some("jsonl") | Some("json"));
    if jsonl { parse_jsonl(reader) } else { parse_text(reader) }
  }

  pub fn len(&self) -> usize {
    self.frames.len()
  }

  // Masks are looked up by frame index, so every frame needs a record.
  pub fn check_length(&self, source_length: Option<usize>) -> Result<()> {
    match source_length {
      Some(n) if n == self.len() => Ok(()),
      Some(n) => bail!("Bounding box file has {} frames but the video has {}.", self.len(), n),
      None => bail!("Cannot check the bounding box file against a video of unknown length."),
    }
  }

  pub fn boxes(&self, frame_index: usize) -> &[BoundingBox] {
    self.frames.get(frame_index).map(|b| &b[..]).unwrap_or(&[])
  }
}

// `frame_id x1 y1 x2 y2 conf [x1 y1 x2 y2 conf ...]` per line.
fn parse_text<R: BufRead>(reader: R) -> Result<BoxList> {
  let mut frames = vec![];
  for (line_number, line) in reader.lines().enumerate() {
    let line = line.context("Failed to read bounding box file.")?;
    let mut tokens = line.split_whitespace();
    let frame_id = match tokens.next().map(|t| t.parse::<i64>()) {
      Some(Ok(id)) => id,
      _ => continue,
    };
    let values = tokens
      .map(|t| t.parse::<f64>())
      .collect::<std::result::Result<Vec<_>, _>>()
      .context(format!("Bad bounding box value on line {}.", line_number + 1))?;
    if values.len() % 5 != 0 {
      warn!("Bounding boxes of frame {} have {} values, not a multiple of five.", frame_id, values.len());
    }
    frames.push(values.chunks_exact(5).map(BoundingBox::from_values).collect());
  }
  Ok(BoxList { frames })
}

// `{"frame": n, "boxes": [[x1, y1, x2, y2, conf], ...]}` per line.
fn parse_jsonl<R: BufRead>(reader: R) -> Result<BoxList> {
  let mut frames = vec![];
  for line in reader.lines() {
    let line = line.context("Failed to read bounding box file.")?;
    if line.trim().is_empty() { continue }
    let record: BoxRecord = serde_json::from_str(&line)
      .context(format!("Bounding box JSON deserialization failed for line: {}", line))?;
    if record.frame != frames.len() {
      warn!("Bounding box record for frame {} found at position {}.", record.frame, frames.len());
    }
    frames.push(record.boxes.iter().map(|b| BoundingBox::from_values(b)).collect());
  }
  Ok(BoxList { frames })
}

// Keep mask: 1 everywhere except inside the boxes.
pub fn fill_mask(mask: &mut Image, boxes: &[BoundingBox]) {
  mask.data.iter_mut().for_each(|v| *v = 1);
  for b in boxes {
    let x0 = b.top_left[0].max(0.) as usize;
    let y0 = b.top_left[1].max(0.) as usize;
    let x1 = b.bottom_right[0].min(mask.width as f64).max(0.) as usize;
    let y1 = b.bottom_right[1].min(mask.height as f64).max(0.) as usize;
    for y in y0..y1 {
      for x in x0..x1 {
        mask.set_value(x, y, 0);
      }
    }
  }
}
