mod index_map;
mod offset;

pub use crate::index_map::{IndexMapBuilder, IndexSourceMap, Section};
pub use crate::offset::{lines_count, OffsetTracker, Position};
