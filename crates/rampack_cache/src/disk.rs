use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use xxhash_rust::xxh3::xxh3_64;

use rampack_common::TransformerOutput;

use crate::CacheKey;

/// Persistent blob store under a cache directory. One file per key,
/// sharded by the first hex byte. Writers rename a temp file into place,
/// so readers in other processes never observe a torn entry. Reads refresh
/// the file mtime, which is the LRU clock for eviction.
///
/// Blob layout: 8-byte little-endian xxh3 of the payload, then the JSON
/// payload. A checksum mismatch discards the entry silently.
#[derive(Debug)]
pub struct DiskStore {
  root: PathBuf,
  budget_bytes: u64,
}

impl DiskStore {
  pub fn new(root: PathBuf, budget_bytes: u64) -> Self {
    Self { root, budget_bytes }
  }

  /// Opens the store, wiping any previous contents when `reset` is set.
  pub fn open(root: PathBuf, budget_bytes: u64, reset: bool) -> io::Result<Self> {
    if reset && root.exists() {
      fs::remove_dir_all(&root)?;
    }
    fs::create_dir_all(&root)?;
    Ok(Self::new(root, budget_bytes))
  }

  fn blob_path(&self, key: &CacheKey) -> PathBuf {
    let hex = key.to_hex();
    self.root.join(&hex[..2]).join(&hex[2..])
  }

  pub fn get(&self, key: &CacheKey) -> Option<TransformerOutput> {
    let path = self.blob_path(key);
    let bytes = fs::read(&path).ok()?;
    if bytes.len() < 8 {
      self.discard(&path);
      return None;
    }

    let (checksum, payload) = bytes.split_at(8);
    if checksum != xxh3_64(payload).to_le_bytes() {
      tracing::debug!(path = %path.display(), "discarding corrupt cache blob");
      self.discard(&path);
      return None;
    }

    let entry = match serde_json::from_slice(payload) {
      Ok(entry) => entry,
      Err(_) => {
        self.discard(&path);
        return None;
      }
    };

    touch(&path);
    Some(entry)
  }

  pub fn put(&self, key: &CacheKey, entry: &TransformerOutput) -> io::Result<()> {
    let path = self.blob_path(key);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }

    let payload = serde_json::to_vec(entry)?;
    let mut bytes = Vec::with_capacity(payload.len() + 8);
    bytes.extend_from_slice(&xxh3_64(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, &path)?;

    self.evict_to_budget()
  }

  fn discard(&self, path: &Path) {
    let _ = fs::remove_file(path);
  }

  fn evict_to_budget(&self) -> io::Result<()> {
    let mut blobs = Vec::new();
    let mut total: u64 = 0;

    for shard in fs::read_dir(&self.root)? {
      let shard = shard?;
      if !shard.file_type()?.is_dir() {
        continue;
      }
      for blob in fs::read_dir(shard.path())? {
        let blob = blob?;
        let meta = blob.metadata()?;
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        total += meta.len();
        blobs.push((modified, meta.len(), blob.path()));
      }
    }

    if total <= self.budget_bytes {
      return Ok(());
    }

    blobs.sort_by_key(|(modified, ..)| *modified);
    for (_, len, path) in blobs {
      if total <= self.budget_bytes {
        break;
      }
      tracing::debug!(path = %path.display(), "evicting cache blob");
      self.discard(&path);
      total = total.saturating_sub(len);
    }

    Ok(())
  }
}

fn touch(path: &Path) {
  if let Ok(file) = fs::File::options().append(true).open(path) {
    let _ = file.set_modified(SystemTime::now());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(code: &str) -> TransformerOutput {
    TransformerOutput { code: code.to_string(), map: None, dependencies: vec![] }
  }

  #[test]
  fn roundtrip_and_atomic_layout() {
    let dir = tempfile::tempdir().unwrap();
    let store = DiskStore::new(dir.path().to_path_buf(), 1 << 20);
    let key = CacheKey::new(b"a", "k", "{}");

    store.put(&key, &entry("code")).unwrap();
    assert_eq!(store.get(&key).unwrap().code, "code");

    // No temp files left behind after a completed write.
    let shard = dir.path().join(&key.to_hex()[..2]);
    for file in fs::read_dir(shard).unwrap() {
      let name = file.unwrap().file_name();
      assert!(!name.to_string_lossy().ends_with(".tmp"));
    }
  }

  #[test]
  fn corrupt_blob_is_discarded_silently() {
    let dir = tempfile::tempdir().unwrap();
    let store = DiskStore::new(dir.path().to_path_buf(), 1 << 20);
    let key = CacheKey::new(b"a", "k", "{}");

    store.put(&key, &entry("code")).unwrap();
    let hex = key.to_hex();
    let blob = dir.path().join(&hex[..2]).join(&hex[2..]);
    fs::write(&blob, b"garbage that is long enough").unwrap();

    assert!(store.get(&key).is_none());
    // The broken blob is gone so the next put starts clean.
    assert!(!blob.exists());
  }

  #[test]
  fn eviction_keeps_recently_used_entries() {
    let dir = tempfile::tempdir().unwrap();
    // A budget small enough that two entries cannot coexist.
    let store = DiskStore::new(dir.path().to_path_buf(), 96);

    let old = CacheKey::new(b"old", "k", "{}");
    let new = CacheKey::new(b"new", "k", "{}");

    store.put(&old, &entry("0123456789012345678901234567890123456789")).unwrap();
    // Age the first blob so the LRU ordering is unambiguous.
    let hex = old.to_hex();
    let blob = dir.path().join(&hex[..2]).join(&hex[2..]);
    fs::File::options()
      .append(true)
      .open(&blob)
      .unwrap()
      .set_modified(SystemTime::UNIX_EPOCH)
      .unwrap();

    store.put(&new, &entry("0123456789012345678901234567890123456789")).unwrap();

    assert!(store.get(&old).is_none());
    assert!(store.get(&new).is_some());
  }

  #[test]
  fn open_with_reset_wipes_previous_contents() {
    let dir = tempfile::tempdir().unwrap();
    let key = CacheKey::new(b"a", "k", "{}");

    let store = DiskStore::open(dir.path().to_path_buf(), 1 << 20, false).unwrap();
    store.put(&key, &entry("code")).unwrap();

    let store = DiskStore::open(dir.path().to_path_buf(), 1 << 20, true).unwrap();
    assert!(store.get(&key).is_none());
  }
}
