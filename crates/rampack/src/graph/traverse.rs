use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc;

use rampack_common::{
  Module, ModulePath, ModuleType, ResolvedRequest, TransformOptions, TransformerOutput,
};
use rampack_error::BuildResult;
use rampack_utils::indexmap::FxIndexMap;

use crate::graph::Graph;
use crate::module_id::IdAllocator;
use crate::types::{SharedFs, SharedOptions, SharedResolver};
use crate::worker::{Priority, TransformPool};

/// Shared pieces every module task needs.
pub(crate) struct TaskContext {
  pub fs: SharedFs,
  pub resolver: SharedResolver,
  pub pool: TransformPool,
  pub options: SharedOptions,
  pub tx: mpsc::Sender<TraverseMsg>,
}

pub(crate) enum TraverseMsg {
  Done(Box<ModuleTaskResult>),
  Failed { error: anyhow::Error },
}

pub(crate) struct ModuleTaskResult {
  pub path: ModulePath,
  pub output: TransformerOutput,
  pub resolved_deps: Vec<(String, ResolvedRequest)>,
}

struct ModuleTask {
  ctx: Arc<TaskContext>,
  path: ModulePath,
  priority: Priority,
}

impl ModuleTask {
  async fn run(self) {
    if let Err(error) = self.run_inner().await {
      let _ = self.ctx.tx.send(TraverseMsg::Failed { error }).await;
    }
  }

  async fn run_inner(&self) -> anyhow::Result<()> {
    let source = self
      .ctx
      .fs
      .read_to_string(self.path.as_path())
      .map_err(|err| anyhow::anyhow!("Could not load {} - {err}", self.path))?;

    let transform_options = TransformOptions {
      dev: self.ctx.options.dev,
      minify: self.ctx.options.minify,
      platform: self.ctx.options.platform,
    };
    let output = self
      .ctx
      .pool
      .transform(&self.path, &source, &transform_options, self.priority)
      .await
      .map_err(anyhow::Error::new)?;

    let mut resolved_deps = Vec::with_capacity(output.dependencies.len());
    for request in &output.dependencies {
      let resolved = self
        .ctx
        .resolver
        .resolve(Some(self.path.as_path()), request, self.ctx.options.platform)
        .map_err(anyhow::Error::new)?;
      resolved_deps.push((request.clone(), resolved));
    }

    let result = ModuleTaskResult { path: self.path.clone(), output, resolved_deps };
    let _ = self.ctx.tx.send(TraverseMsg::Done(Box::new(result))).await;
    Ok(())
  }
}

#[derive(Debug, Default)]
pub(crate) struct TraverseOutput {
  /// Paths (re)transformed or newly materialized in this traversal.
  pub modified: FxHashSet<ModulePath>,
  /// Paths present before that no entry point reaches anymore.
  pub deleted: FxHashSet<ModulePath>,
}

/// One traversal over the graph: transforms a set of root modules in
/// parallel, follows newly referenced edges breadth-first, and commits
/// the whole batch atomically. Nothing is committed when any task fails,
/// so a failed traversal leaves the previous snapshot intact.
pub(crate) struct GraphTraversal<'graph> {
  pub graph: &'graph mut Graph,
  pub fs: SharedFs,
  pub resolver: SharedResolver,
  pub pool: TransformPool,
  pub options: SharedOptions,
  pub allocator: Arc<IdAllocator>,
}

impl GraphTraversal<'_> {
  /// Resolves the configured entry points and builds the graph from
  /// scratch underneath them.
  pub async fn initial(&mut self) -> BuildResult<TraverseOutput> {
    if self.options.entries.is_empty() {
      Err(anyhow::anyhow!("at least one entry point is required"))?;
    }

    let mut errors: Vec<anyhow::Error> = Vec::new();
    let mut entry_points = Vec::with_capacity(self.options.entries.len());
    for entry in &self.options.entries {
      let request = entry.to_string_lossy();
      match self.resolver.resolve(None, &request, self.options.platform) {
        Ok(resolved) => entry_points.push(resolved.path),
        Err(err) => errors.push(anyhow::Error::new(err)),
      }
    }
    if !errors.is_empty() {
      return Err(errors.into());
    }

    self.graph.set_entry_points(entry_points.clone());
    self.run(entry_points, FxHashSet::default(), Priority::Entry).await
  }

  /// Re-transforms the dirty set, follows edge changes, and drops
  /// whatever became unreachable. `deleted` paths are gone from disk:
  /// their importers re-resolve, and stale resolutions are invalidated.
  pub async fn traverse(
    &mut self,
    dirty: FxHashSet<ModulePath>,
    deleted: FxHashSet<ModulePath>,
  ) -> BuildResult<TraverseOutput> {
    let mut roots: Vec<ModulePath> = Vec::new();
    let mut seen: FxHashSet<ModulePath> = FxHashSet::default();

    for path in &dirty {
      // Unknown paths cannot be reachable yet; asset and comment bodies
      // are synthesized from the path alone; blacklisted files stay
      // untraversed even when their contents change.
      let Some(module) = self.graph.module(path) else { continue };
      if matches!(module.module_type, ModuleType::Asset | ModuleType::Comment)
        || self.is_blacklisted(path)
      {
        continue;
      }
      if seen.insert(path.clone()) {
        roots.push(path.clone());
      }
    }
    for path in &deleted {
      self.resolver.invalidate(path);
      let Some(module) = self.graph.module(path) else { continue };
      for importer in &module.inverse_dependencies {
        if !deleted.contains(importer) && seen.insert(importer.clone()) {
          roots.push(importer.clone());
        }
      }
    }

    self.run(roots, deleted, Priority::Normal).await
  }

  fn is_blacklisted(&self, path: &ModulePath) -> bool {
    self.options.blacklist.as_ref().is_some_and(|blacklist| blacklist.is_match(path.as_str()))
  }

  async fn run(
    &mut self,
    roots: Vec<ModulePath>,
    deleted: FxHashSet<ModulePath>,
    priority: Priority,
  ) -> BuildResult<TraverseOutput> {
    let (tx, mut rx) = mpsc::channel(32);
    let ctx = Arc::new(TaskContext {
      fs: Arc::clone(&self.fs),
      resolver: Arc::clone(&self.resolver),
      pool: self.pool.clone(),
      options: Arc::clone(&self.options),
      tx,
    });

    let mut scheduled: FxHashSet<ModulePath> = FxHashSet::default();
    let mut remaining = 0usize;
    for path in roots {
      if scheduled.insert(path.clone()) {
        spawn_task(&ctx, path, priority);
        remaining += 1;
      }
    }

    let mut results: Vec<ModuleTaskResult> = Vec::new();
    let mut errors: Vec<anyhow::Error> = Vec::new();

    while remaining > 0 {
      let Some(msg) = rx.recv().await else { break };
      remaining -= 1;
      match msg {
        TraverseMsg::Done(result) => {
          for (_, resolved) in &result.resolved_deps {
            if resolved.ignored || resolved.is_asset {
              continue;
            }
            let known = self.graph.contains(&resolved.path) && !deleted.contains(&resolved.path);
            if !known && scheduled.insert(resolved.path.clone()) {
              spawn_task(&ctx, resolved.path.clone(), Priority::Normal);
              remaining += 1;
            }
          }
          results.push(*result);
        }
        TraverseMsg::Failed { error } => errors.push(error),
      }
    }

    // Transform and resolution failures for the whole batch surface
    // together, and nothing below ran: the graph still holds the previous
    // consistent snapshot.
    if !errors.is_empty() {
      return Err(errors.into());
    }

    Ok(self.commit(results, &deleted))
  }

  fn commit(
    &mut self,
    results: Vec<ModuleTaskResult>,
    deleted: &FxHashSet<ModulePath>,
  ) -> TraverseOutput {
    let before: FxHashSet<ModulePath> = self.graph.paths().cloned().collect();
    let mut modified: FxHashSet<ModulePath> = FxHashSet::default();
    // Targets whose reachability counter dropped to zero.
    let mut candidates: Vec<ModulePath> = Vec::new();
    let mut edges_removed = false;

    // Watcher-deleted modules drop out first, releasing their edges.
    for path in deleted {
      let Some(removed) = self.graph.remove(path) else { continue };
      for target in removed.dependency_paths() {
        edges_removed = true;
        if self.graph.drop_inverse_edge(target, path) {
          candidates.push(target.clone());
        }
      }
    }

    // First pass: module records, so placeholder targets and edge targets
    // can be told apart regardless of result arrival order. Old edges are
    // kept aside for diffing.
    let mut old_edges: FxHashMap<ModulePath, FxIndexMap<String, ModulePath>> =
      FxHashMap::default();
    for result in &results {
      let inverse_dependencies = match self.graph.remove(&result.path) {
        Some(previous) => {
          old_edges.insert(result.path.clone(), previous.dependencies);
          previous.inverse_dependencies
        }
        None => FxHashSet::default(),
      };
      self.graph.insert(Module {
        path: result.path.clone(),
        module_type: ModuleType::Module,
        code: result.output.code.clone(),
        map: result.output.map.clone(),
        dependencies: FxIndexMap::default(),
        inverse_dependencies,
        output_id: 0,
      });
      modified.insert(result.path.clone());
    }

    // Second pass: wire edges and materialize asset / ignored targets,
    // counting each added and removed edge on the target.
    for result in &results {
      let mut dependencies: FxIndexMap<String, ModulePath> = FxIndexMap::default();
      for (request, resolved) in &result.resolved_deps {
        if !self.graph.contains(&resolved.path) {
          self.graph.insert(placeholder_module(resolved));
          modified.insert(resolved.path.clone());
        }
        dependencies.insert(request.clone(), resolved.path.clone());
      }

      let old_targets: FxHashSet<ModulePath> = old_edges
        .remove(&result.path)
        .map(|edges| edges.into_values().collect())
        .unwrap_or_default();
      let new_targets: FxHashSet<ModulePath> = dependencies.values().cloned().collect();

      for target in &new_targets {
        if !old_targets.contains(target) {
          self.graph.add_inverse_edge(target, &result.path);
        }
      }
      for target in &old_targets {
        if !new_targets.contains(target) {
          edges_removed = true;
          if self.graph.drop_inverse_edge(target, &result.path) {
            candidates.push(target.clone());
          }
        }
      }

      if let Some(module) = self.graph.module_mut(&result.path) {
        module.dependencies = dependencies;
      }
    }

    // Transitive reference-counted deletion: a target whose counter hit
    // zero goes away unless it is an entry point, releasing its own edges
    // in turn.
    let entry_points: FxHashSet<ModulePath> =
      self.graph.entry_points().iter().cloned().collect();
    let mut gone: FxHashSet<ModulePath> = FxHashSet::default();
    while let Some(path) = candidates.pop() {
      if entry_points.contains(&path) {
        continue;
      }
      let counter_is_zero = self
        .graph
        .module(&path)
        .is_some_and(|module| module.inverse_dependencies.is_empty());
      if !counter_is_zero {
        continue;
      }
      let Some(removed) = self.graph.remove(&path) else { continue };
      gone.insert(path.clone());
      for target in removed.dependency_paths() {
        if self.graph.drop_inverse_edge(target, &path) {
          candidates.push(target.clone());
        }
      }
    }

    // Counters cannot see a cycle that came loose as a whole; when edges
    // went away, a confirming sweep from the entry points collects what
    // they missed.
    if edges_removed {
      gone.extend(self.graph.sweep());
    }

    // Ids are handed out in deterministic bundle order, not in the racy
    // order transform results arrived, so identical trees always produce
    // identical tables. Previously assigned ids are left untouched.
    let ordered: Vec<ModulePath> =
      self.graph.ordered_modules().iter().map(|module| module.path.clone()).collect();
    for path in &ordered {
      let id = self.allocator.id_of(path);
      if let Some(module) = self.graph.module_mut(path) {
        module.output_id = id;
      }
    }

    for path in &gone {
      modified.remove(path);
    }
    let mut deleted_out: FxHashSet<ModulePath> =
      gone.into_iter().filter(|path| before.contains(path)).collect();
    for path in deleted {
      if before.contains(path) {
        deleted_out.insert(path.clone());
      }
    }

    TraverseOutput { modified, deleted: deleted_out }
  }
}

fn spawn_task(ctx: &Arc<TaskContext>, path: ModulePath, priority: Priority) {
  let task = ModuleTask { ctx: Arc::clone(ctx), path, priority };
  tokio::spawn(task.run());
}

/// Asset and blacklisted targets join the graph without being traversed:
/// the edge stays resolved, the module body is synthesized. Blacklisted
/// targets become `Comment` modules, emitted verbatim as a marker and
/// registering nothing.
fn placeholder_module(resolved: &ResolvedRequest) -> Module {
  let (module_type, code) = if resolved.is_asset {
    let registration = serde_json::json!({ "uri": resolved.path.as_str() });
    (ModuleType::Asset, format!("module.exports = {registration};"))
  } else {
    (ModuleType::Comment, format!("// {} is excluded from this bundle", resolved.path))
  };

  Module {
    path: resolved.path.clone(),
    module_type,
    code,
    map: None,
    dependencies: FxIndexMap::default(),
    inverse_dependencies: FxHashSet::default(),
    output_id: 0,
  }
}
