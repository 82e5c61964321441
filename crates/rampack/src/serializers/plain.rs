use base64::Engine;

use rampack_common::Module;
use rampack_sourcemap::IndexMapBuilder;

use crate::graph::Graph;
use crate::module_id::IdAllocator;
use crate::serializers::{
  filter_map_fragment, require_call_modules, wrap_module, SerializeOptions,
};

#[derive(Debug)]
pub struct PlainBundle {
  pub code: String,
  /// Index source map covering the emitted modules.
  pub map: String,
}

/// The concatenated script: prelude scripts, modules in graph iteration
/// order, then one startup require per entry point. Byte-identical for
/// identical graphs.
pub(crate) fn serialize_plain(
  graph: &Graph,
  prelude: &[Module],
  allocator: &IdAllocator,
  options: &SerializeOptions,
) -> PlainBundle {
  let post = require_call_modules(graph, allocator);

  let mut code = String::new();
  let mut map = IndexMapBuilder::default();
  let mut append = |code: &mut String, segment: String, fragment: Option<serde_json::Value>| {
    map.append(&segment, fragment.as_ref());
    code.push_str(&segment);
    map.append("\n", None);
    code.push('\n');
  };

  for module in prelude {
    append(&mut code, wrap_module(module, allocator), None);
  }
  for module in graph.ordered_modules() {
    let fragment = filter_map_fragment(module.map.as_ref(), options.exclude_source);
    append(&mut code, wrap_module(module, allocator), fragment);
  }
  for module in &post {
    append(&mut code, wrap_module(module, allocator), None);
  }

  let map = map.finish().to_json();

  if options.inline_source_map {
    let encoded = base64::engine::general_purpose::STANDARD.encode(map.as_bytes());
    code.push_str("//# sourceMappingURL=data:application/json;charset=utf-8;base64,");
    code.push_str(&encoded);
    code.push('\n');
  } else if let Some(url) = &options.source_map_url {
    code.push_str("//# sourceMappingURL=");
    code.push_str(url);
    code.push('\n');
  }

  PlainBundle { code, map }
}
