pub(crate) mod delta_json;
pub(crate) mod file_ram;
pub(crate) mod plain;
pub(crate) mod ram_bundle;

use rampack_common::{Module, ModulePath, ModuleType};
use rampack_utils::indexmap::FxIndexMap;

use crate::graph::Graph;
use crate::module_id::IdAllocator;

/// Per-request serialization knobs (the stable query-parameter surface).
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
  pub source_map_url: Option<String>,
  pub inline_source_map: bool,
  pub exclude_source: bool,
}

/// Wraps one module for emission. `Module` and `Asset` bodies register a
/// factory under their numeric id; `Script` and `Comment` code is emitted
/// verbatim; `RequireCall` code is already a bare numeric require.
pub(crate) fn wrap_module(module: &Module, allocator: &IdAllocator) -> String {
  match module.module_type {
    ModuleType::Script | ModuleType::Comment | ModuleType::RequireCall => module.code.clone(),
    ModuleType::Module | ModuleType::Asset => {
      let body = rewrite_requires(&module.code, &module.dependencies, allocator);
      format!(
        "__d(function(require, module, exports) {{\n{body}\n}}, {});",
        module.output_id
      )
    }
  }
}

/// Rewrites textual `require("<request>")` calls to `require(<id>)`,
/// using the same allocator handle the serializers emit tables from.
fn rewrite_requires(
  code: &str,
  dependencies: &FxIndexMap<String, ModulePath>,
  allocator: &IdAllocator,
) -> String {
  let mut rewritten = code.to_string();
  for (request, target) in dependencies {
    let id = allocator.id_of(target);
    let numeric = format!("require({id})");
    for quote in ['"', '\''] {
      let textual = format!("require({quote}{request}{quote})");
      rewritten = rewritten.replace(&textual, &numeric);
    }
  }
  rewritten
}

/// One `RequireCall` pseudo-module per entry point, generated at emission
/// time so the ids always match the module table.
pub(crate) fn require_call_modules(graph: &Graph, allocator: &IdAllocator) -> Vec<Module> {
  graph
    .entry_points()
    .iter()
    .map(|entry| {
      let entry_id = allocator.id_of(entry);
      let path = ModulePath::from(format!("{entry}$startup"));
      Module {
        output_id: allocator.id_of(&path),
        path,
        module_type: ModuleType::RequireCall,
        code: format!("require({entry_id});"),
        map: None,
        dependencies: FxIndexMap::default(),
        inverse_dependencies: Default::default(),
      }
    })
    .collect()
}

/// Strips embedded source text from a map fragment when the request asked
/// for `excludeSource`.
pub(crate) fn filter_map_fragment(
  map: Option<&serde_json::Value>,
  exclude_source: bool,
) -> Option<serde_json::Value> {
  let map = map?;
  if !exclude_source {
    return Some(map.clone());
  }
  let mut filtered = map.clone();
  if let Some(object) = filtered.as_object_mut() {
    object.remove("sourcesContent");
  }
  Some(filtered)
}
