use std::io;
use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::FileSystem;

/// In-memory file tree. Directories are implicit: a path is a directory
/// when some stored file lives underneath it.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
  files: DashMap<PathBuf, Vec<u8>>,
}

impl MemoryFileSystem {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
    self.files.insert(path.into(), content.into());
  }

  pub fn file_names(&self) -> Vec<PathBuf> {
    let mut names: Vec<_> = self.files.iter().map(|entry| entry.key().clone()).collect();
    names.sort();
    names
  }
}

fn not_found(path: &Path) -> io::Error {
  io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path.display()))
}

impl FileSystem for MemoryFileSystem {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    self.files.get(path).map(|entry| entry.value().clone()).ok_or_else(|| not_found(path))
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    let bytes = self.read(path)?;
    String::from_utf8(bytes)
      .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "file is not valid utf8"))
  }

  fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
    self.files.insert(path.to_path_buf(), content.to_vec());
    Ok(())
  }

  fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
    Ok(())
  }

  fn remove_file(&self, path: &Path) -> io::Result<()> {
    self.files.remove(path).map(|_| ()).ok_or_else(|| not_found(path))
  }

  fn is_file(&self, path: &Path) -> bool {
    self.files.contains_key(path)
  }

  fn is_dir(&self, path: &Path) -> bool {
    self.files.iter().any(|entry| entry.key().starts_with(path) && entry.key() != path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn implicit_directories() {
    let fs = MemoryFileSystem::new();
    fs.add_file("/app/src/index.js", "42;");

    assert!(fs.is_file(Path::new("/app/src/index.js")));
    assert!(fs.is_dir(Path::new("/app/src")));
    assert!(fs.is_dir(Path::new("/app")));
    assert!(!fs.is_dir(Path::new("/app/src/index.js")));
    assert!(!fs.is_file(Path::new("/app/src")));
  }

  #[test]
  fn read_after_remove_fails() {
    let fs = MemoryFileSystem::new();
    fs.add_file("/a.js", "1;");
    assert_eq!(fs.read_to_string(Path::new("/a.js")).unwrap(), "1;");

    fs.remove_file(Path::new("/a.js")).unwrap();
    assert!(fs.read(Path::new("/a.js")).is_err());
  }
}
