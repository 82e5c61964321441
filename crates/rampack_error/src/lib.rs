use std::ops::{Deref, DerefMut};

#[derive(Debug)]
pub struct BuildError(pub Vec<anyhow::Error>);

impl Deref for BuildError {
  type Target = Vec<anyhow::Error>;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl DerefMut for BuildError {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.0
  }
}

impl From<anyhow::Error> for BuildError {
  fn from(error: anyhow::Error) -> Self {
    Self(vec![error])
  }
}

impl From<Vec<anyhow::Error>> for BuildError {
  fn from(errors: Vec<anyhow::Error>) -> Self {
    Self(errors)
  }
}

impl std::fmt::Display for BuildError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for (index, error) in self.0.iter().enumerate() {
      if index > 0 {
        writeln!(f)?;
      }
      write!(f, "{error}")?;
    }
    Ok(())
  }
}

pub type BuildResult<T> = anyhow::Result<T, BuildError>;

/// A module request that no probed candidate could satisfy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unable to resolve module `{request}` from `{from}`. Tried:\n  {}", candidates.join("\n  "))]
pub struct Unresolved {
  pub from: String,
  pub request: String,
  pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformErrorKind {
  Syntax,
  Plugin,
  Io,
  Cancelled,
}

impl std::fmt::Display for TransformErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = match self {
      Self::Syntax => "syntax error",
      Self::Plugin => "plugin failure",
      Self::Io => "io error",
      Self::Cancelled => "cancelled",
    };
    f.write_str(label)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
  pub line: u32,
  pub column: u32,
}

/// Failure while transforming a single module. Permanent until the source
/// changes; never written to the transform cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {kind}: {message}")]
pub struct TransformError {
  pub path: String,
  pub kind: TransformErrorKind,
  pub message: String,
  pub location: Option<SourceLocation>,
}

impl TransformError {
  pub fn cancelled(path: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      kind: TransformErrorKind::Cancelled,
      message: "the bundle session ended before the transform completed".to_string(),
      location: None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out waiting for the file watcher to become ready")]
pub struct WatcherTimeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the bundle session has ended")]
pub struct SessionClosed;
