use std::sync::Arc;

use rampack_common::{NormalizedBundlerOptions, Transformer};
use rampack_fs::FileSystem;
use rampack_resolver::Resolver;

pub type SharedFs = Arc<dyn FileSystem>;
pub type SharedOptions = Arc<NormalizedBundlerOptions>;
pub type SharedResolver = Arc<Resolver<SharedFs>>;
pub type SharedTransformer = Arc<dyn Transformer>;
