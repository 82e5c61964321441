use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

use rampack_common::ModulePath;

/// Assigns a stable `u32` per module path, monotonically increasing in
/// order of first sight. Ids are never reused within a session, even when
/// the module is deleted and re-added. One `Arc<IdAllocator>` is threaded
/// into both the require-rewrite pass and the serializers so emitted
/// `require(<id>)` calls always agree with the module table.
#[derive(Debug, Default)]
pub struct IdAllocator {
  ids: DashMap<ModulePath, u32>,
  next: AtomicU32,
}

impl IdAllocator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn id_of(&self, path: &ModulePath) -> u32 {
    *self
      .ids
      .entry(path.clone())
      .or_insert_with(|| self.next.fetch_add(1, Ordering::SeqCst))
  }

  /// The id already assigned to `path`, if any.
  pub fn lookup(&self, path: &ModulePath) -> Option<u32> {
    self.ids.get(path).map(|id| *id)
  }

  pub fn assigned_count(&self) -> u32 {
    self.next.load(Ordering::SeqCst)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_monotonic_and_stable() {
    let allocator = IdAllocator::new();
    let a = ModulePath::from("/a.js");
    let b = ModulePath::from("/b.js");

    assert_eq!(allocator.id_of(&a), 0);
    assert_eq!(allocator.id_of(&b), 1);
    assert_eq!(allocator.id_of(&a), 0);
    assert_eq!(allocator.lookup(&b), Some(1));
    assert_eq!(allocator.assigned_count(), 2);
  }
}
