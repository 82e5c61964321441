use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use rampack_common::{TransformOptions, Transformer, TransformerOutput};
use rampack_error::TransformError;

static REQUIRE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"require\(['"]([^'"]+)['"]\)"#).expect("require pattern is valid"));

/// Default transform collaborator: passes code through untouched and
/// collects `require('…')` request strings in order of first appearance.
/// Embedders with a real compiler pipeline inject their own
/// [`Transformer`] instead.
#[derive(Debug, Default)]
pub struct RequireCollector;

impl Transformer for RequireCollector {
  fn transform(
    &self,
    _path: &Path,
    source: &str,
    _options: &TransformOptions,
  ) -> Result<TransformerOutput, TransformError> {
    let mut dependencies: Vec<String> = Vec::new();
    for capture in REQUIRE_RE.captures_iter(source) {
      let request = &capture[1];
      if !dependencies.iter().any(|known| known == request) {
        dependencies.push(request.to_string());
      }
    }

    Ok(TransformerOutput { code: source.to_string(), map: None, dependencies })
  }

  fn cache_key(&self) -> &str {
    "require-collector@1"
  }
}
