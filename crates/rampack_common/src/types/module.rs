use rustc_hash::FxHashSet;

use rampack_utils::indexmap::FxIndexMap;

use crate::{ModulePath, ModuleType};

/// A single source file plus its transformed code and resolved edges.
///
/// `dependencies` maps the request string as it appeared in source to the
/// resolved path, in order of first appearance. `inverse_dependencies` is
/// the set of modules whose `dependencies` point here.
#[derive(Debug, Clone)]
pub struct Module {
  pub path: ModulePath,
  pub module_type: ModuleType,
  pub code: String,
  /// Raw per-module source-map fragment produced by the transformer.
  pub map: Option<serde_json::Value>,
  pub dependencies: FxIndexMap<String, ModulePath>,
  pub inverse_dependencies: FxHashSet<ModulePath>,
  /// Numeric id assigned on first sight, stable for the session.
  pub output_id: u32,
}

impl Module {
  pub fn dependency_paths(&self) -> impl Iterator<Item = &ModulePath> {
    self.dependencies.values()
  }
}
