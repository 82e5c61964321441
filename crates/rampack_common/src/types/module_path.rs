use std::path::Path;

use arcstr::ArcStr;

/// `ModulePath` is the absolute, platform-normalized path identifying a
/// module for the lifetime of a bundle session.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct ModulePath(ArcStr);

impl ModulePath {
  pub fn new(value: impl Into<ArcStr>) -> Self {
    Self(value.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn as_path(&self) -> &Path {
    Path::new(self.as_str())
  }
}

impl std::ops::Deref for ModulePath {
  type Target = str;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl AsRef<str> for ModulePath {
  fn as_ref(&self) -> &str {
    self
  }
}

impl std::fmt::Display for ModulePath {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self)
  }
}

impl From<ArcStr> for ModulePath {
  fn from(value: ArcStr) -> Self {
    Self(value)
  }
}

impl From<&str> for ModulePath {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}

impl From<String> for ModulePath {
  fn from(value: String) -> Self {
    Self::new(value)
  }
}

impl serde::Serialize for ModulePath {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self)
  }
}
