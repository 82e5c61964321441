use serde::{Deserialize, Serialize};

use rampack_common::{Delta, Module};

use crate::module_id::IdAllocator;
use crate::serializers::wrap_module;

/// The delta wire format. `pre`/`post` are populated on resets; `delta`
/// pairs a module id with its wrapped code, or `null` for a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaResponse {
  pub id: String,
  pub pre: Vec<(u32, String)>,
  pub post: Vec<(u32, String)>,
  pub delta: Vec<(u32, Option<String>)>,
  pub reset: bool,
}

pub(crate) fn build_response(
  epoch_id: String,
  delta: &Delta,
  prelude: &[Module],
  post: &[Module],
  allocator: &IdAllocator,
) -> DeltaResponse {
  let mut changes: Vec<(u32, Option<String>)> = Vec::new();
  for module in delta.modified.values() {
    changes.push((module.output_id, Some(wrap_module(module, allocator))));
  }
  for path in &delta.deleted {
    if let Some(id) = allocator.lookup(path) {
      changes.push((id, None));
    }
  }
  changes.sort_by_key(|(id, _)| *id);

  let emit = |modules: &[Module]| -> Vec<(u32, String)> {
    modules
      .iter()
      .map(|module| (module.output_id, wrap_module(module, allocator)))
      .collect()
  };

  DeltaResponse {
    id: epoch_id,
    pre: if delta.reset { emit(prelude) } else { Vec::new() },
    post: if delta.reset { emit(post) } else { Vec::new() },
    delta: changes,
    reset: delta.reset,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wire_shape_uses_nested_arrays_and_null_deletions() {
    let response = DeltaResponse {
      id: "epoch-1".to_string(),
      pre: vec![(0, "prelude();".to_string())],
      post: vec![(3, "require(1);".to_string())],
      delta: vec![(1, Some("__d(...);".to_string())), (2, None)],
      reset: true,
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"pre\":[[0,\"prelude();\"]]"));
    assert!(json.contains("\"delta\":[[1,\"__d(...);\"],[2,null]]"));

    let parsed: DeltaResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, response);
  }
}
