use std::path::Path;
use std::sync::Arc;

use rampack_cache::{DiskStore, TransformCache};
use rampack_common::{BundlerOptions, Module, Watcher};
use rampack_error::BuildResult;
use rampack_fs::OsFileSystem;
use rampack_resolver::{Resolver, ResolverOptions};

use crate::delta::session::{load_prelude, DeltaSession};
use crate::delta::DeltaCalculator;
use crate::graph::traverse::GraphTraversal;
use crate::graph::Graph;
use crate::module_id::IdAllocator;
use crate::serializers::file_ram::{serialize_file_ram, FileRamBundle};
use crate::serializers::plain::{serialize_plain, PlainBundle};
use crate::serializers::ram_bundle::{serialize_indexed_ram, IndexedRamBundle};
use crate::serializers::SerializeOptions;
use crate::transformer::RequireCollector;
use crate::types::{SharedFs, SharedOptions, SharedResolver, SharedTransformer};
use crate::worker::TransformPool;

/// The embedding facade: wires options into the resolver, cache, and
/// worker pool, then drives one-shot builds or long-lived dev sessions.
pub struct Bundler {
  fs: SharedFs,
  options: SharedOptions,
  resolver: SharedResolver,
  cache: Arc<TransformCache>,
  transformer: SharedTransformer,
}

impl Bundler {
  pub fn new(options: BundlerOptions) -> BuildResult<Self> {
    Self::with_collaborators(options, Arc::new(OsFileSystem), Arc::new(RequireCollector))
  }

  /// Injects the filesystem and transformer seams; tests pair this with
  /// an in-memory filesystem.
  pub fn with_collaborators(
    options: BundlerOptions,
    fs: SharedFs,
    transformer: SharedTransformer,
  ) -> BuildResult<Self> {
    let options = crate::utils::normalize_options(options)?;

    let resolver = Arc::new(Resolver::new(
      ResolverOptions {
        project_roots: options.project_roots.clone(),
        source_exts: options.source_exts.clone(),
        asset_exts: options.asset_exts.clone(),
        blacklist: options.blacklist.clone(),
      },
      Arc::clone(&fs),
    ));

    let cache = match &options.cache_dir {
      Some(dir) => {
        let store = DiskStore::open(dir.clone(), options.cache_budget_bytes, options.reset_cache)
          .map_err(|err| anyhow::anyhow!("could not open transform cache - {err}"))?;
        Arc::new(TransformCache::with_disk(store))
      }
      None => Arc::new(TransformCache::in_memory()),
    };

    Ok(Self { fs, options, resolver, cache, transformer })
  }

  pub fn options(&self) -> &SharedOptions {
    &self.options
  }

  fn spawn_pool(&self) -> TransformPool {
    // transformerKey and cacheVersion both invalidate the cache; the
    // transformer's own identity rides along.
    let cache_token = format!(
      "{}\u{1}{}\u{1}{}",
      self.options.transformer_key,
      self.options.cache_version,
      self.transformer.cache_key()
    );
    TransformPool::new(
      Arc::clone(&self.transformer),
      Arc::clone(&self.cache),
      cache_token,
      self.options.max_workers,
    )
  }

  /// One-shot build: traverse from the entries and hand back a snapshot
  /// the serializers can emit in any of the three formats.
  pub async fn build(&self) -> BuildResult<BundleGraph> {
    let allocator = Arc::new(IdAllocator::new());
    let prelude = load_prelude(&self.fs, &self.options.polyfills, &allocator)?;

    let pool = self.spawn_pool();
    let mut graph = Graph::default();
    let mut traversal = GraphTraversal {
      graph: &mut graph,
      fs: Arc::clone(&self.fs),
      resolver: Arc::clone(&self.resolver),
      pool: pool.clone(),
      options: Arc::clone(&self.options),
      allocator: Arc::clone(&allocator),
    };
    let result = traversal.initial().await;
    pool.close();
    result?;

    tracing::info!(modules = graph.len(), "build finished");
    Ok(BundleGraph { graph, prelude, allocator, fs: Arc::clone(&self.fs) })
  }

  /// Start a development session fed by the injected watcher. The first
  /// `get_delta` performs the initial traversal.
  pub async fn dev_session(&self, watcher: Watcher) -> BuildResult<DeltaSession> {
    let allocator = Arc::new(IdAllocator::new());
    let prelude = load_prelude(&self.fs, &self.options.polyfills, &allocator)?;

    let calculator = DeltaCalculator::new(
      Arc::clone(&self.fs),
      Arc::clone(&self.resolver),
      self.spawn_pool(),
      Arc::clone(&self.options),
      allocator,
    );
    DeltaSession::new(calculator, prelude, watcher).await
  }
}

/// A finished one-shot build: the graph snapshot plus everything the
/// serializers need to emit it.
pub struct BundleGraph {
  graph: Graph,
  prelude: Vec<Module>,
  allocator: Arc<IdAllocator>,
  fs: SharedFs,
}

impl BundleGraph {
  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  pub fn prelude(&self) -> &[Module] {
    &self.prelude
  }

  pub fn to_plain(&self, options: &SerializeOptions) -> PlainBundle {
    serialize_plain(&self.graph, &self.prelude, &self.allocator, options)
  }

  pub fn to_indexed_ram(&self, options: &SerializeOptions) -> IndexedRamBundle {
    serialize_indexed_ram(&self.graph, &self.prelude, &self.allocator, options)
  }

  pub fn write_file_ram(&self, out_dir: &Path) -> BuildResult<FileRamBundle> {
    serialize_file_ram(&self.graph, &self.prelude, &self.allocator, &self.fs, out_dir)
  }
}
