mod bundler_options;
mod transformer;
mod types;
mod watch;

pub use bundler_options::{
  normalized_bundler_options::NormalizedBundlerOptions, platform::Platform, BundlerOptions,
};

// Internal file layout is not part of the API; everything is exported at the root.
pub use crate::types::{
  delta::Delta,
  module::Module,
  module_path::ModulePath,
  module_type::ModuleType,
  resolved_request::ResolvedRequest,
  transform::{TransformOptions, TransformerOutput},
};
pub use crate::watch::{WatchEvent, WatchEventKind, Watcher};
pub use transformer::Transformer;
