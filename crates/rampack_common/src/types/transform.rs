use serde::{Deserialize, Serialize};

use crate::Platform;

/// Per-request knobs that change transform output. Serialized into the
/// content-addressed cache key, so field order here is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TransformOptions {
  pub dev: bool,
  pub minify: bool,
  pub platform: Option<Platform>,
}

impl Default for TransformOptions {
  fn default() -> Self {
    Self { dev: true, minify: false, platform: None }
  }
}

/// What the transformer hands back for one module: runtime-ready (but not
/// yet wrapped) code, an opaque source-map fragment, and the request
/// strings in order of first appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerOutput {
  pub code: String,
  pub map: Option<serde_json::Value>,
  pub dependencies: Vec<String>,
}
