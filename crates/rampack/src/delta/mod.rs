pub(crate) mod session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashSet;
use tokio::sync::watch;

use rampack_common::{Delta, ModulePath, WatchEvent, WatchEventKind};
use rampack_error::{BuildError, BuildResult, SessionClosed};

use crate::graph::traverse::GraphTraversal;
use crate::graph::Graph;
use crate::module_id::IdAllocator;
use crate::types::{SharedFs, SharedOptions, SharedResolver};
use crate::worker::TransformPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  /// No build has run yet.
  Fresh,
  /// Graph mirrors the source tree.
  Clean,
  /// Watcher events are waiting for the next build.
  Dirty,
  /// A traversal is running; new events accumulate separately.
  Building,
}

struct CalcState {
  phase: Phase,
  dirty: FxHashSet<ModulePath>,
  deleted: FxHashSet<ModulePath>,
  pending_dirty: FxHashSet<ModulePath>,
  pending_deleted: FxHashSet<ModulePath>,
  inflight: Option<watch::Receiver<Option<Arc<BuildResult<Delta>>>>>,
}

pub(crate) struct CalcShared {
  pub fs: SharedFs,
  pub resolver: SharedResolver,
  pub pool: TransformPool,
  pub options: SharedOptions,
  pub allocator: Arc<IdAllocator>,
  pub graph: tokio::sync::RwLock<Graph>,
  state: Mutex<CalcState>,
  closed: AtomicBool,
}

/// The per-session engine: consumes watcher events, runs at most one
/// traversal at a time, and hands out minimal `{modified, deleted, reset}`
/// deltas. Concurrent `get_delta` callers share the in-flight result;
/// events arriving mid-build are queued for the next one.
pub struct DeltaCalculator {
  pub(crate) shared: Arc<CalcShared>,
}

impl DeltaCalculator {
  pub(crate) fn new(
    fs: SharedFs,
    resolver: SharedResolver,
    pool: TransformPool,
    options: SharedOptions,
    allocator: Arc<IdAllocator>,
  ) -> Self {
    Self {
      shared: Arc::new(CalcShared {
        fs,
        resolver,
        pool,
        options,
        allocator,
        graph: tokio::sync::RwLock::new(Graph::default()),
        state: Mutex::new(CalcState {
          phase: Phase::Fresh,
          dirty: FxHashSet::default(),
          deleted: FxHashSet::default(),
          pending_dirty: FxHashSet::default(),
          pending_deleted: FxHashSet::default(),
          inflight: None,
        }),
        closed: AtomicBool::new(false),
      }),
    }
  }

  pub fn allocator(&self) -> Arc<IdAllocator> {
    Arc::clone(&self.shared.allocator)
  }

  /// Read access to the graph between builds. The graph stays readable
  /// after `end()`.
  pub async fn graph(&self) -> tokio::sync::RwLockReadGuard<'_, Graph> {
    self.shared.graph.read().await
  }

  pub fn is_closed(&self) -> bool {
    self.shared.closed.load(Ordering::SeqCst)
  }

  /// Feed one watcher event. Deletes followed by a change or re-add of
  /// the same path coalesce into a single re-transform from disk;
  /// standalone adds are ignored until something references them.
  pub fn on_event(&self, event: WatchEvent) {
    let mut state = self.shared.state.lock().expect("delta state lock poisoned");
    let building = state.phase == Phase::Building;
    let CalcState { dirty, deleted, pending_dirty, pending_deleted, .. } = &mut *state;
    let (dirty, deleted) =
      if building { (pending_dirty, pending_deleted) } else { (dirty, deleted) };

    let path = event.path;
    match event.kind {
      WatchEventKind::Change => {
        deleted.remove(&path);
        dirty.insert(path);
      }
      WatchEventKind::Delete => {
        dirty.remove(&path);
        deleted.insert(path);
      }
      WatchEventKind::Add => {
        if deleted.remove(&path) {
          dirty.insert(path);
        } else if building || self.path_in_graph(&path) {
          // Re-appeared while we could not look: schedule it; traversal
          // skips paths the graph does not know.
          dirty.insert(path);
        }
        // A path nothing references cannot be reachable yet: ignored.
      }
    }

    if !building
      && state.phase != Phase::Fresh
      && (!state.dirty.is_empty() || !state.deleted.is_empty())
    {
      state.phase = Phase::Dirty;
    }
  }

  fn path_in_graph(&self, path: &ModulePath) -> bool {
    // The graph writer only runs while `Building`, and this is only
    // consulted outside a build.
    self.shared.graph.try_read().map(|graph| graph.contains(path)).unwrap_or(false)
  }

  /// Compute the next delta. With `reset`, every currently-reachable
  /// module is reported as modified after pending events are applied.
  pub async fn get_delta(&self, reset: bool) -> BuildResult<Delta> {
    loop {
      if self.is_closed() {
        Err(anyhow::Error::new(SessionClosed))?;
      }

      let role = {
        let mut state = self.shared.state.lock().expect("delta state lock poisoned");
        if let Some(rx) = &state.inflight {
          BuilderRole::Follower(rx.clone())
        } else {
          let (tx, rx) = watch::channel(None);
          state.inflight = Some(rx);
          let snapshot = Snapshot {
            dirty: std::mem::take(&mut state.dirty),
            deleted: std::mem::take(&mut state.deleted),
            fresh: state.phase == Phase::Fresh,
          };
          state.phase = Phase::Building;
          BuilderRole::Builder(tx, snapshot)
        }
      };

      match role {
        BuilderRole::Follower(mut rx) => {
          loop {
            let published = rx.borrow().clone();
            if let Some(result) = published {
              return share_result(&result);
            }
            if rx.changed().await.is_err() {
              // Builder dropped without publishing; take over.
              break;
            }
          }
        }
        BuilderRole::Builder(tx, snapshot) => {
          let mut guard = BuilderGuard { shared: &self.shared, snapshot: Some(snapshot) };
          let snapshot = guard.snapshot.as_ref().expect("snapshot taken once");
          let result = Arc::new(
            self
              .build(snapshot.dirty.clone(), snapshot.deleted.clone(), snapshot.fresh, reset)
              .await,
          );
          guard.finish(result.is_err());
          let _ = tx.send(Some(Arc::clone(&result)));
          return share_result(&result);
        }
      }
    }
  }

  async fn build(
    &self,
    dirty: FxHashSet<ModulePath>,
    deleted: FxHashSet<ModulePath>,
    fresh: bool,
    reset: bool,
  ) -> BuildResult<Delta> {
    let shared = &self.shared;
    let mut graph = shared.graph.write().await;

    if fresh {
      let mut traversal = traversal(shared, &mut graph);
      traversal.initial().await?;
      tracing::info!(modules = graph.len(), "initial graph built");
      return Ok(full_delta(&graph));
    }

    let output = if dirty.is_empty() && deleted.is_empty() {
      Default::default()
    } else {
      let mut traversal = traversal(shared, &mut graph);
      let output = traversal.traverse(dirty, deleted).await?;
      tracing::debug!(
        modified = output.modified.len(),
        deleted = output.deleted.len(),
        "incremental traversal finished"
      );
      output
    };

    if reset {
      return Ok(full_delta(&graph));
    }

    let mut delta = Delta::default();
    for path in output.modified {
      if let Some(module) = graph.module(&path) {
        delta.modified.insert(path, module.clone());
      }
    }
    delta.deleted = output.deleted;
    Ok(delta)
  }

  /// Idempotent. Abandons in-flight transforms, fails pending `get_delta`
  /// callers, and leaves the graph readable for late observers.
  pub fn end(&self) {
    if self.shared.closed.swap(true, Ordering::SeqCst) {
      return;
    }
    tracing::info!("delta session ended");
    self.shared.pool.close();
  }
}

impl Clone for DeltaCalculator {
  fn clone(&self) -> Self {
    Self { shared: Arc::clone(&self.shared) }
  }
}

struct Snapshot {
  dirty: FxHashSet<ModulePath>,
  deleted: FxHashSet<ModulePath>,
  fresh: bool,
}

enum BuilderRole {
  Follower(watch::Receiver<Option<Arc<BuildResult<Delta>>>>),
  Builder(watch::Sender<Option<Arc<BuildResult<Delta>>>>, Snapshot),
}

/// Restores calculator state when the build finishes or its future is
/// dropped mid-await. On failure the snapshot is merged back so the next
/// `get_delta` retries the same dirty set.
struct BuilderGuard<'a> {
  shared: &'a CalcShared,
  snapshot: Option<Snapshot>,
}

impl BuilderGuard<'_> {
  fn finish(&mut self, failed: bool) {
    let Some(snapshot) = self.snapshot.take() else { return };
    let mut state = self.shared.state.lock().expect("delta state lock poisoned");
    state.inflight = None;

    if failed {
      state.dirty.extend(snapshot.dirty);
      state.deleted.extend(snapshot.deleted);
    }
    let pending_dirty = std::mem::take(&mut state.pending_dirty);
    let pending_deleted = std::mem::take(&mut state.pending_deleted);
    for path in pending_dirty {
      state.deleted.remove(&path);
      state.dirty.insert(path);
    }
    state.deleted.extend(pending_deleted);

    state.phase = if failed && snapshot.fresh {
      Phase::Fresh
    } else if state.dirty.is_empty() && state.deleted.is_empty() {
      Phase::Clean
    } else {
      Phase::Dirty
    };
  }
}

impl Drop for BuilderGuard<'_> {
  fn drop(&mut self) {
    // Reached only when the build future was dropped before finishing.
    self.finish(true);
  }
}

fn traversal<'graph>(
  shared: &CalcShared,
  graph: &'graph mut Graph,
) -> GraphTraversal<'graph> {
  GraphTraversal {
    graph,
    fs: Arc::clone(&shared.fs),
    resolver: Arc::clone(&shared.resolver),
    pool: shared.pool.clone(),
    options: Arc::clone(&shared.options),
    allocator: Arc::clone(&shared.allocator),
  }
}

fn full_delta(graph: &Graph) -> Delta {
  let mut delta = Delta { reset: true, ..Default::default() };
  for module in graph.modules() {
    delta.modified.insert(module.path.clone(), module.clone());
  }
  delta
}

/// Deltas are shared between concurrent callers; errors cannot be cloned,
/// so followers get a re-rendered copy of each failure.
fn share_result(result: &Arc<BuildResult<Delta>>) -> BuildResult<Delta> {
  match &**result {
    Ok(delta) => Ok(delta.clone()),
    Err(errors) => Err(BuildError(
      errors.iter().map(|error| anyhow::anyhow!("{error:#}")).collect(),
    )),
  }
}
