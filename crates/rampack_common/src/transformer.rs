use std::path::Path;

use rampack_error::TransformError;

use crate::{TransformOptions, TransformerOutput};

/// The injected transform collaborator. Implementations parse one module,
/// rewrite it into runtime-ready form, and report its dependency requests
/// in source order. Called from worker tasks, so it must be thread-safe.
pub trait Transformer: Send + Sync + 'static {
  fn transform(
    &self,
    path: &Path,
    source: &str,
    options: &TransformOptions,
  ) -> Result<TransformerOutput, TransformError>;

  /// Identity string mixed into every cache key. Bump when the transform
  /// output changes for identical input.
  fn cache_key(&self) -> &str;
}
