mod attrs;
mod index;

pub use attrs::{AttrMap, AttrValue};
pub use index::SpatialIndex;
