use crate::all::*;

// Appearance information gathered along a track, one update per step and
// serialized after the displacements when the trajectory is emitted.
pub trait DescriptorAccumulator {
  fn update(&mut self, image: &Image, point: &Vector2d);
  fn write(&self, out: &mut String);
}

// Builds one accumulator per new track.
pub type DescriptorFactory = Box<dyn Fn() -> Box<dyn DescriptorAccumulator>>;

// Writes nothing, records carry only the trajectory shape.
pub struct NoDescriptor;

impl DescriptorAccumulator for NoDescriptor {
  fn update(&mut self, _: &Image, _: &Vector2d) {}
  fn write(&self, _: &mut String) {}
}

pub fn no_descriptor_factory() -> DescriptorFactory {
  Box::new(|| Box::new(NoDescriptor))
}
