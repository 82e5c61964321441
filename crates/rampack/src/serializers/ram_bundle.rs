use rampack_common::{Module, ModulePath};
use rampack_sourcemap::IndexMapBuilder;

use crate::graph::Graph;
use crate::module_id::IdAllocator;
use crate::serializers::{
  filter_map_fragment, require_call_modules, wrap_module, SerializeOptions,
};

/// `0xFB0BD1E5`, little-endian on disk: `E5 D1 0B FB`.
pub const RAM_BUNDLE_MAGIC: u32 = 0xFB0B_D1E5;

const PREFACE_BYTES: usize = 12;
const PAIR_BYTES: usize = 8;

#[derive(Debug)]
pub struct IndexedRamBundle {
  pub bytes: Vec<u8>,
  /// Asset modules are excluded from the index; their payloads are
  /// emitted alongside by the asset collaborator.
  pub assets: Vec<ModulePath>,
  pub map: String,
}

/// The binary random-access container:
///
/// ```text
/// offset  size  meaning
/// 0       4     magic
/// 4       4     header_size = 8 + 8*N
/// 8       4     startup code length, including its trailing NUL
/// 12      8*N   (offset, length) pairs for ids 0..N-1
/// 12+8N   ...   startup code, NUL-terminated, then module code segments
/// ```
///
/// Offsets are absolute from file start; lengths exclude the terminating
/// NUL; ids without a module keep `(0, 0)`.
pub(crate) fn serialize_indexed_ram(
  graph: &Graph,
  prelude: &[Module],
  allocator: &IdAllocator,
  options: &SerializeOptions,
) -> IndexedRamBundle {
  let post = require_call_modules(graph, allocator);

  let mut startup = String::new();
  for module in prelude.iter().chain(&post) {
    startup.push_str(&wrap_module(module, allocator));
    startup.push('\n');
  }

  let mut entries: Vec<(u32, String, Option<serde_json::Value>)> = Vec::new();
  let mut assets: Vec<ModulePath> = Vec::new();
  for module in graph.ordered_modules() {
    if module.module_type.is_indexed() {
      entries.push((
        module.output_id,
        wrap_module(module, allocator),
        filter_map_fragment(module.map.as_ref(), options.exclude_source),
      ));
    } else if module.module_type == rampack_common::ModuleType::Asset {
      assets.push(module.path.clone());
    }
  }
  entries.sort_by_key(|(id, ..)| *id);
  assets.sort();

  let n = entries.last().map(|(id, ..)| *id as usize + 1).unwrap_or(0);
  let header_size = (8 + PAIR_BYTES * n) as u32;
  let startup_size = (startup.len() + 1) as u32;

  let mut table = vec![(0u32, 0u32); n];
  let mut offset = PREFACE_BYTES + PAIR_BYTES * n + startup_size as usize;
  for (id, code, _) in &entries {
    table[*id as usize] = (offset as u32, code.len() as u32);
    offset += code.len() + 1;
  }

  let mut bytes = Vec::with_capacity(offset);
  bytes.extend_from_slice(&RAM_BUNDLE_MAGIC.to_le_bytes());
  bytes.extend_from_slice(&header_size.to_le_bytes());
  bytes.extend_from_slice(&startup_size.to_le_bytes());
  for (pair_offset, pair_length) in &table {
    bytes.extend_from_slice(&pair_offset.to_le_bytes());
    bytes.extend_from_slice(&pair_length.to_le_bytes());
  }
  bytes.extend_from_slice(startup.as_bytes());
  bytes.push(0);
  for (_, code, _) in &entries {
    bytes.extend_from_slice(code.as_bytes());
    bytes.push(0);
  }

  // The source map mirrors the physical layout: startup first, then the
  // code segments in id order.
  let mut map = IndexMapBuilder::default();
  map.append(&startup, None);
  for (_, code, fragment) in &entries {
    map.append(code, fragment.as_ref());
    map.append("\n", None);
  }

  IndexedRamBundle { bytes, assets, map: map.finish().to_json() }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedRamBundle {
  pub startup: Vec<u8>,
  /// `(offset, length)` per module id, exactly as stored.
  pub table: Vec<(u32, u32)>,
}

/// Reads back the header written by [`serialize_indexed_ram`]. Returns
/// `None` on a bad magic number or a truncated file.
pub fn parse_indexed_ram(bytes: &[u8]) -> Option<ParsedRamBundle> {
  let read_u32 = |at: usize| -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
  };

  if read_u32(0)? != RAM_BUNDLE_MAGIC {
    return None;
  }
  let header_size = read_u32(4)? as usize;
  let startup_size = read_u32(8)? as usize;
  let n = header_size.checked_sub(8)? / PAIR_BYTES;

  let mut table = Vec::with_capacity(n);
  for index in 0..n {
    let at = PREFACE_BYTES + index * PAIR_BYTES;
    table.push((read_u32(at)?, read_u32(at + 4)?));
  }

  let startup_at = PREFACE_BYTES + n * PAIR_BYTES;
  let startup_end = startup_at + startup_size.checked_sub(1)?;
  let startup = bytes.get(startup_at..startup_end)?.to_vec();

  Some(ParsedRamBundle { startup, table })
}
