use crate::all::*;

// Point pairs between the previous and the current frame, in scale 0 pixels.
#[derive(Clone, Debug, Default)]
pub struct Correspondences {
  pub prev: Vec<Vector2d>,
  pub curr: Vec<Vector2d>,
}

impl Correspondences {
  pub fn push(&mut self, prev: Vector2d, curr: Vector2d) {
    self.prev.push(prev);
    self.curr.push(curr);
  }

  pub fn len(&self) -> usize {
    assert_eq!(self.prev.len(), self.curr.len());
    self.prev.len()
  }

  pub fn clear(&mut self) {
    self.prev.clear();
    self.curr.clear();
  }

  // Flow-derived pairs first, then feature pairs. Duplicates are kept.
  pub fn merge(&mut self, flow_matches: &Correspondences, feature_matches: &Correspondences) {
    self.clear();
    self.prev.extend_from_slice(&flow_matches.prev);
    self.prev.extend_from_slice(&feature_matches.prev);
    self.curr.extend_from_slice(&flow_matches.curr);
    self.curr.extend_from_slice(&feature_matches.curr);
  }
}

// Samples the flow on a regular grid, skipping pixels outside the mask.
pub fn match_from_flow(flow: &FlowField, mask: &Image, stride: usize, out: &mut Correspondences) {
  out.clear();
  let offset = stride / 2;
  let mut y = offset;
  while y < flow.height {
    let mut x = offset;
    while x < flow.width {
      if mask.value(x, y) != 0 {
        let p = Vector2d::new(x as f64, y as f64);
        out.push(p, p + flow.at(x, y));
      }
      x += stride;
    }
    y += stride;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_match_from_flow() {
    let flow = uniform_flow(32, 16, [1.5, -0.5]);
    let mask = Image::filled(32, 16, 1);
    let mut out = Correspondences::default();
    match_from_flow(&flow, &mask, 8, &mut out);
    assert_eq!(out.len(), 4 * 2);
    assert_eq!(out.prev[0], Vector2d::new(4., 4.));
    assert_eq!(out.curr[0], Vector2d::new(5.5, 3.5));
    assert_eq!(out.prev[1], Vector2d::new(12., 4.));
    assert_eq!(out.prev[4], Vector2d::new(4., 12.));
  }

  #[test]
  fn test_mask_excludes_flow_matches() {
    let flow = uniform_flow(32, 16, [0., 0.]);
    let mut mask = Image::filled(32, 16, 1);
    fill_mask(&mut mask, &[BoundingBox {
      top_left: Vector2d::new(0., 0.),
      bottom_right: Vector2d::new(16., 16.),
      confidence: 0.8,
    }]);
    let mut out = Correspondences::default();
    match_from_flow(&flow, &mask, 8, &mut out);
    assert_eq!(out.len(), 4);
    assert!(out.prev.iter().all(|p| p[0] >= 16.));

    match_from_flow(&flow, &Image::filled(32, 16, 0), 8, &mut out);
    assert_eq!(out.len(), 0);
  }

  #[test]
  fn test_merge_order() {
    let mut flow_matches = Correspondences::default();
    flow_matches.push(Vector2d::new(1., 1.), Vector2d::new(2., 2.));
    flow_matches.push(Vector2d::new(3., 3.), Vector2d::new(4., 4.));
    let mut feature_matches = Correspondences::default();
    feature_matches.push(Vector2d::new(1., 1.), Vector2d::new(2., 2.));

    let mut merged = Correspondences::default();
    merged.push(Vector2d::new(9., 9.), Vector2d::new(9., 9.));
    merged.merge(&flow_matches, &feature_matches);
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.prev[1], Vector2d::new(3., 3.));
    assert_eq!(merged.prev[2], Vector2d::new(1., 1.));
    assert_eq!(merged.curr[2], Vector2d::new(2., 2.));

    merged.merge(&Correspondences::default(), &Correspondences::default());
    assert_eq!(merged.len(), 0);
  }
}
