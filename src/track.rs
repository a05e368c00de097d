use crate::all::*;

// Trajectory length and the refill gap, fixed for the run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackInfo {
  pub length: usize,
  pub gap: usize,
}

impl TrackInfo {
  pub fn new(length: usize, gap: usize) -> Result<TrackInfo> {
    if length < 2 {
      bail!("Trajectory length must be at least 2, got {}.", length);
    }
    if gap < 1 {
      bail!("Refill gap must be at least 1, got {}.", gap);
    }
    Ok(TrackInfo { length, gap })
  }
}

// Vector that never grows past its capacity.
#[derive(Clone, Debug)]
pub struct BoundedSeq<T> {
  items: Vec<T>,
  capacity: usize,
}

impl<T> BoundedSeq<T> {
  pub fn new(capacity: usize) -> BoundedSeq<T> {
    BoundedSeq {
      items: Vec::with_capacity(capacity),
      capacity,
    }
  }

  pub fn push(&mut self, item: T) {
    assert!(self.items.len() < self.capacity, "Bounded sequence is full ({}).", self.capacity);
    self.items.push(item);
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_full(&self) -> bool {
    self.items.len() == self.capacity
  }

  pub fn as_slice(&self) -> &[T] {
    &self.items
  }

}

pub struct Track {
  pub points: BoundedSeq<Vector2d>,
  pub displacements: BoundedSeq<Vector2d>,
  pub descriptor: Box<dyn DescriptorAccumulator>,
}

impl Track {
  pub fn new(point: Vector2d, info: &TrackInfo, descriptor: Box<dyn DescriptorAccumulator>) -> Track {
    let mut points = BoundedSeq::new(info.length + 1);
    points.push(point);
    Track {
      points,
      displacements: BoundedSeq::new(info.length),
      descriptor,
    }
  }

  // Number of completed steps.
  pub fn index(&self) -> usize {
    self.displacements.len()
  }

  pub fn position(&self) -> Vector2d {
    self.points.as_slice()[self.index()]
  }

  pub fn advance(&mut self, point: Vector2d, displacement: Vector2d) {
    assert!(!self.is_complete());
    self.displacements.push(displacement);
    self.points.push(point);
  }

  pub fn is_complete(&self) -> bool {
    self.displacements.is_full()
  }
}
