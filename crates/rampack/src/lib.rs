mod bundler;
mod delta;
mod graph;
mod module_id;
mod serializers;
mod transformer;
mod utils;
mod worker;

pub(crate) mod types;

pub use crate::bundler::{BundleGraph, Bundler};
pub use crate::delta::{session::DeltaSession, DeltaCalculator};
pub use crate::graph::Graph;
pub use crate::module_id::IdAllocator;
pub use crate::serializers::{
  delta_json::DeltaResponse,
  file_ram::{FileRamBundle, FILE_RAM_SENTINEL},
  plain::PlainBundle,
  ram_bundle::{parse_indexed_ram, IndexedRamBundle, ParsedRamBundle, RAM_BUNDLE_MAGIC},
  SerializeOptions,
};
pub use crate::transformer::RequireCollector;
pub use crate::worker::{Priority, TransformPool};
pub use rampack_common::*;
pub use rampack_error::{
  BuildError, BuildResult, SessionClosed, TransformError, TransformErrorKind, Unresolved,
  WatcherTimeout,
};
