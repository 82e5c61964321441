pub(crate) mod traverse;

use rustc_hash::{FxHashMap, FxHashSet};

use rampack_common::{Module, ModulePath};

/// The in-memory dependency graph: module records keyed by path, with
/// bidirectional edges. Mutated only by traversals, which commit whole
/// batches at once; between commits every edge target is present and
/// back-linked.
#[derive(Debug, Default)]
pub struct Graph {
  entry_points: Vec<ModulePath>,
  modules: FxHashMap<ModulePath, Module>,
}

impl Graph {
  pub fn new(entry_points: Vec<ModulePath>) -> Self {
    Self { entry_points, modules: FxHashMap::default() }
  }

  pub fn entry_points(&self) -> &[ModulePath] {
    &self.entry_points
  }

  pub(crate) fn set_entry_points(&mut self, entry_points: Vec<ModulePath>) {
    self.entry_points = entry_points;
  }

  pub fn contains(&self, path: &ModulePath) -> bool {
    self.modules.contains_key(path)
  }

  pub fn module(&self, path: &ModulePath) -> Option<&Module> {
    self.modules.get(path)
  }

  pub(crate) fn module_mut(&mut self, path: &ModulePath) -> Option<&mut Module> {
    self.modules.get_mut(path)
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  pub fn paths(&self) -> impl Iterator<Item = &ModulePath> {
    self.modules.keys()
  }

  pub fn modules(&self) -> impl Iterator<Item = &Module> {
    self.modules.values()
  }

  pub(crate) fn insert(&mut self, module: Module) {
    self.modules.insert(module.path.clone(), module);
  }

  pub(crate) fn remove(&mut self, path: &ModulePath) -> Option<Module> {
    self.modules.remove(path)
  }

  /// Modules in deterministic bundle order: breadth-first from the first
  /// entry point, visiting edges in their source order.
  pub fn ordered_modules(&self) -> Vec<&Module> {
    let mut ordered = Vec::with_capacity(self.modules.len());
    let mut visited: FxHashSet<&ModulePath> = FxHashSet::default();
    let mut queue: std::collections::VecDeque<&ModulePath> = std::collections::VecDeque::new();

    for entry in &self.entry_points {
      if visited.insert(entry) {
        queue.push_back(entry);
      }
    }

    while let Some(path) = queue.pop_front() {
      let Some(module) = self.modules.get(path) else { continue };
      ordered.push(module);
      for target in module.dependency_paths() {
        if self.modules.contains_key(target) && visited.insert(target) {
          queue.push_back(target);
        }
      }
    }

    ordered
  }

  pub(crate) fn add_inverse_edge(&mut self, target: &ModulePath, importer: &ModulePath) {
    if let Some(module) = self.modules.get_mut(target) {
      module.inverse_dependencies.insert(importer.clone());
    }
  }

  /// Removes one inverse edge. The size of `inverse_dependencies` is the
  /// target's reachability counter; returns true when it dropped to zero.
  pub(crate) fn drop_inverse_edge(&mut self, target: &ModulePath, importer: &ModulePath) -> bool {
    match self.modules.get_mut(target) {
      Some(module) => {
        module.inverse_dependencies.remove(importer);
        module.inverse_dependencies.is_empty()
      }
      None => false,
    }
  }

  pub fn reachable_set(&self) -> FxHashSet<ModulePath> {
    let mut reachable: FxHashSet<ModulePath> = FxHashSet::default();
    let mut stack: Vec<&ModulePath> = self.entry_points.iter().collect();

    while let Some(path) = stack.pop() {
      let Some(module) = self.modules.get(path) else { continue };
      if !reachable.insert(path.clone()) {
        continue;
      }
      for target in module.dependency_paths() {
        if !reachable.contains(target) {
          stack.push(target);
        }
      }
    }

    reachable
  }

  /// Drops every module no entry point reaches. Cycles detached from the
  /// entry points are collected too. Returns the removed paths.
  pub(crate) fn sweep(&mut self) -> FxHashSet<ModulePath> {
    let reachable = self.reachable_set();
    let removed: FxHashSet<ModulePath> =
      self.modules.keys().filter(|path| !reachable.contains(*path)).cloned().collect();

    for path in &removed {
      self.modules.remove(path);
    }
    for module in self.modules.values_mut() {
      for path in &removed {
        module.inverse_dependencies.remove(path);
      }
    }

    removed
  }

  /// Every edge target must exist and be back-linked from its importer,
  /// and nothing unreachable may linger. Test support.
  pub fn assert_consistent(&self) {
    for (path, module) in &self.modules {
      for target in module.dependency_paths() {
        let target_module = self
          .modules
          .get(target)
          .unwrap_or_else(|| panic!("{path} depends on missing module {target}"));
        assert!(
          target_module.inverse_dependencies.contains(path),
          "{target} is missing the inverse edge back to {path}",
        );
      }
    }
    let reachable = self.reachable_set();
    for path in self.modules.keys() {
      assert!(reachable.contains(path), "{path} is unreachable but still present");
    }
  }
}
