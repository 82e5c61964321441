use std::io;
use std::path::Path;
use std::sync::Arc;

/// The filesystem seam the bundler reads sources through and writes bundle
/// artifacts through. Injected so tests and embedders can substitute an
/// in-memory tree.
pub trait FileSystem: Send + Sync {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  fn read_to_string(&self, path: &Path) -> io::Result<String>;

  fn write(&self, path: &Path, content: &[u8]) -> io::Result<()>;

  fn create_dir_all(&self, path: &Path) -> io::Result<()>;

  fn remove_file(&self, path: &Path) -> io::Result<()>;

  fn is_file(&self, path: &Path) -> bool;

  fn is_dir(&self, path: &Path) -> bool;
}

impl<T: FileSystem + ?Sized> FileSystem for Arc<T> {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    self.as_ref().read(path)
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    self.as_ref().read_to_string(path)
  }

  fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
    self.as_ref().write(path, content)
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    self.as_ref().create_dir_all(path)
  }

  fn remove_file(&self, path: &Path) -> io::Result<()> {
    self.as_ref().remove_file(path)
  }

  fn is_file(&self, path: &Path) -> bool {
    self.as_ref().is_file(path)
  }

  fn is_dir(&self, path: &Path) -> bool {
    self.as_ref().is_dir(path)
  }
}
