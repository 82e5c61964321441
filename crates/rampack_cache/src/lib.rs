mod disk;
mod key;

use dashmap::DashMap;

use rampack_common::TransformerOutput;

pub use crate::disk::DiskStore;
pub use crate::key::{canonical_options_json, CacheKey};

/// Content-addressed transform store: a hot in-memory layer over an
/// optional persistent blob store. Keys are content-derived, so lookups
/// are pure and concurrent builds of identical inputs converge on one
/// entry.
#[derive(Debug, Default)]
pub struct TransformCache {
  memory: DashMap<CacheKey, TransformerOutput>,
  disk: Option<DiskStore>,
}

impl TransformCache {
  pub fn in_memory() -> Self {
    Self::default()
  }

  pub fn with_disk(disk: DiskStore) -> Self {
    Self { memory: DashMap::default(), disk: Some(disk) }
  }

  pub fn get(&self, key: &CacheKey) -> Option<TransformerOutput> {
    if let Some(hit) = self.memory.get(key) {
      return Some(hit.clone());
    }
    let entry = self.disk.as_ref()?.get(key)?;
    self.memory.insert(key.clone(), entry.clone());
    Some(entry)
  }

  pub fn put(&self, key: CacheKey, entry: TransformerOutput) {
    if let Some(disk) = &self.disk {
      if let Err(error) = disk.put(&key, &entry) {
        tracing::warn!(key = %key.to_hex(), %error, "failed to persist transform cache entry");
      }
    }
    self.memory.insert(key, entry);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(code: &str) -> TransformerOutput {
    TransformerOutput { code: code.to_string(), map: None, dependencies: vec![] }
  }

  #[test]
  fn memory_roundtrip() {
    let cache = TransformCache::in_memory();
    let key = CacheKey::new(b"source", "test", "{}");

    assert!(cache.get(&key).is_none());
    cache.put(key.clone(), entry("transformed"));
    assert_eq!(cache.get(&key).unwrap().code, "transformed");
  }

  #[test]
  fn disk_survives_memory_loss() {
    let dir = tempfile::tempdir().unwrap();
    let key = CacheKey::new(b"source", "test", "{}");

    let cache = TransformCache::with_disk(DiskStore::new(dir.path().to_path_buf(), 1 << 20));
    cache.put(key.clone(), entry("persisted"));

    // A fresh cache over the same directory only has the disk layer.
    let cache = TransformCache::with_disk(DiskStore::new(dir.path().to_path_buf(), 1 << 20));
    assert_eq!(cache.get(&key).unwrap().code, "persisted");
  }
}
