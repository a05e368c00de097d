use crate::all::*;

// Places new tracking points on a regular grid, keeping only textured
// locations that are not too close to each other or to existing tracks.
pub struct DenseSampler {
  quality: f64,
  min_distance: usize,
}

// Spatial hash of accepted points with cells as large as the rejection radius,
// so a distance query only has to look at the 3x3 neighbouring cells.
struct OccupancyGrid {
  cells: Vec<Vec<Vector2d>>,
  cols: usize,
  rows: usize,
  cell_size: f64,
}

impl OccupancyGrid {
  fn new(width: usize, height: usize, cell_size: usize) -> OccupancyGrid {
    let cols = (width + cell_size - 1) / cell_size + 1;
    let rows = (height + cell_size - 1) / cell_size + 1;
    OccupancyGrid {
      cells: vec![vec![]; cols * rows],
      cols,
      rows,
      cell_size: cell_size as f64,
    }
  }

  fn cell(&self, p: &Vector2d) -> [usize; 2] {
    let cx = (p[0] / self.cell_size).floor().clamp(0., (self.cols - 1) as f64);
    let cy = (p[1] / self.cell_size).floor().clamp(0., (self.rows - 1) as f64);
    [cx as usize, cy as usize]
  }

  fn insert(&mut self, p: Vector2d) {
    let [cx, cy] = self.cell(&p);
    self.cells[cy * self.cols + cx].push(p);
  }

  fn has_neighbor(&self, p: &Vector2d, distance: f64) -> bool {
    let [cx, cy] = self.cell(p);
    for y in cy.saturating_sub(1)..=usize::min(cy + 1, self.rows - 1) {
      for x in cx.saturating_sub(1)..=usize::min(cx + 1, self.cols - 1) {
        for q in &self.cells[y * self.cols + x] {
          if (q - p).norm() < distance { return true }
        }
      }
    }
    false
  }
}

impl DenseSampler {
  pub fn new(p: &ParameterSet) -> DenseSampler {
    DenseSampler {
      quality: p.quality,
      min_distance: p.min_distance,
    }
  }

  // Deterministic: equal responses keep their raster order.
  pub fn sample(&self, image: &Image, occupied: &[Vector2d]) -> Vec<Vector2d> {
    let d = self.min_distance;
    if image.width < d || image.height < d { return vec![] }
    let response = min_eigen_response(image, 3);
    if response.max <= 0. { return vec![] }
    let threshold = (response.max as f64 * self.quality) as f32;

    let offset = d / 2;
    let mut candidates = vec![];
    for gy in 0..(image.height / d) {
      for gx in 0..(image.width / d) {
        let x = gx * d + offset;
        let y = gy * d + offset;
        let v = response.value(x, y);
        if v > 0. && v >= threshold {
          candidates.push((v, Vector2d::new(x as f64, y as f64)));
        }
      }
    }
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut grid = OccupancyGrid::new(image.width, image.height, d);
    for p in occupied {
      grid.insert(*p);
    }
    let mut points = vec![];
    for (_, p) in candidates {
      if grid.has_neighbor(&p, d as f64) { continue }
      grid.insert(p);
      points.push(p);
    }
    points
  }
}
