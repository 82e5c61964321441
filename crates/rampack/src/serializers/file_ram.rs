use std::path::{Path, PathBuf};

use rampack_common::{Module, ModulePath};
use rampack_error::BuildResult;

use crate::graph::Graph;
use crate::module_id::IdAllocator;
use crate::serializers::ram_bundle::RAM_BUNDLE_MAGIC;
use crate::serializers::{require_call_modules, wrap_module};
use crate::types::SharedFs;

/// Sentinel file name; its 4-byte body is the little-endian magic.
pub const FILE_RAM_SENTINEL: &str = "UNBUNDLE";

const MODULES_DIR: &str = "js-modules";

#[derive(Debug)]
pub struct FileRamBundle {
  pub written: Vec<PathBuf>,
  pub assets: Vec<ModulePath>,
}

/// The per-file RAM layout: `UNBUNDLE` sentinel at the root, startup code
/// in `js-modules/UNBUNDLE.js`, and one `js-modules/<id>.js` per module.
pub(crate) fn serialize_file_ram(
  graph: &Graph,
  prelude: &[Module],
  allocator: &IdAllocator,
  fs: &SharedFs,
  out_dir: &Path,
) -> BuildResult<FileRamBundle> {
  let modules_dir = out_dir.join(MODULES_DIR);
  fs.create_dir_all(&modules_dir).map_err(io_error)?;

  let mut written = Vec::new();

  let sentinel = out_dir.join(FILE_RAM_SENTINEL);
  fs.write(&sentinel, &RAM_BUNDLE_MAGIC.to_le_bytes()).map_err(io_error)?;
  written.push(sentinel);

  let post = require_call_modules(graph, allocator);
  let mut startup = String::new();
  for module in prelude.iter().chain(&post) {
    startup.push_str(&wrap_module(module, allocator));
    startup.push('\n');
  }
  let startup_file = modules_dir.join(format!("{FILE_RAM_SENTINEL}.js"));
  fs.write(&startup_file, startup.as_bytes()).map_err(io_error)?;
  written.push(startup_file);

  let mut assets = Vec::new();
  for module in graph.ordered_modules() {
    if module.module_type.is_indexed() {
      let file = modules_dir.join(format!("{}.js", module.output_id));
      fs.write(&file, wrap_module(module, allocator).as_bytes()).map_err(io_error)?;
      written.push(file);
    } else if module.module_type == rampack_common::ModuleType::Asset {
      assets.push(module.path.clone());
    }
  }
  assets.sort();

  Ok(FileRamBundle { written, assets })
}

fn io_error(err: std::io::Error) -> rampack_error::BuildError {
  anyhow::Error::new(err).into()
}
