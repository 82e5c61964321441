use serde::Serialize;

use crate::offset::{OffsetTracker, Position};

#[derive(Debug, Serialize)]
pub struct Section {
  pub offset: Position,
  pub map: serde_json::Value,
}

/// An index-style source map: per-module fragments placed at the
/// `(line, column)` where each module's code begins in the final bundle.
#[derive(Debug, Serialize)]
pub struct IndexSourceMap {
  pub version: u32,
  pub sections: Vec<Section>,
}

impl IndexSourceMap {
  pub fn to_json(&self) -> String {
    serde_json::to_string(self).expect("index source maps are always serializable")
  }
}

/// Builds the index map while the serializer appends bundle segments.
/// Every appended segment advances the tracker; segments that carry a
/// fragment get a section recorded at their start position.
#[derive(Debug, Default)]
pub struct IndexMapBuilder {
  tracker: OffsetTracker,
  sections: Vec<Section>,
}

impl IndexMapBuilder {
  pub fn append(&mut self, segment: &str, map: Option<&serde_json::Value>) {
    if let Some(map) = map {
      self.sections.push(Section { offset: self.tracker.position(), map: map.clone() });
    }
    self.tracker.advance(segment);
  }

  pub fn finish(self) -> IndexSourceMap {
    IndexSourceMap { version: 3, sections: self.sections }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sections_carry_the_segment_start_offsets() {
    let first = serde_json::json!({"version": 3, "mappings": "AAAA"});
    let second = serde_json::json!({"version": 3, "mappings": "AACA"});

    let mut builder = IndexMapBuilder::default();
    builder.append("// prelude\n", None);
    builder.append("__d(code);\n", Some(&first));
    builder.append("__d(more);", Some(&second));
    let map = builder.finish();

    assert_eq!(map.version, 3);
    assert_eq!(map.sections.len(), 2);
    assert_eq!(map.sections[0].offset, Position { line: 1, column: 0 });
    assert_eq!(map.sections[1].offset, Position { line: 2, column: 0 });
  }

  #[test]
  fn json_shape_matches_the_index_map_format() {
    let mut builder = IndexMapBuilder::default();
    builder.append("a();", Some(&serde_json::json!({"version": 3})));
    let json = builder.finish().to_json();

    assert!(json.starts_with("{\"version\":3,\"sections\":["));
    assert!(json.contains("\"offset\":{\"line\":0,\"column\":0}"));
  }
}
