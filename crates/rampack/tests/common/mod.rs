use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rampack::{
  Bundler, BundlerOptions, DeltaSession, TransformError, TransformErrorKind, TransformOptions,
  Transformer, TransformerOutput, WatchEvent, WatchEventKind, Watcher,
};
use rampack_fs::{FileSystem, MemoryFileSystem};

/// Marker that makes [`RecordingTransformer`] fail, standing in for a
/// syntax error from a real compiler pipeline.
pub const BROKEN: &str = "@@broken";

/// Wraps the stock require collector, recording every transformed path
/// and failing on sources that contain [`BROKEN`].
pub struct RecordingTransformer {
  inner: rampack::RequireCollector,
  pub calls: Mutex<Vec<String>>,
}

impl RecordingTransformer {
  pub fn new() -> Self {
    Self { inner: rampack::RequireCollector, calls: Mutex::new(Vec::new()) }
  }

  pub fn take_calls(&self) -> Vec<String> {
    std::mem::take(&mut self.calls.lock().unwrap())
  }
}

impl Transformer for RecordingTransformer {
  fn transform(
    &self,
    path: &Path,
    source: &str,
    options: &TransformOptions,
  ) -> Result<TransformerOutput, TransformError> {
    self.calls.lock().unwrap().push(path.display().to_string());
    if source.contains(BROKEN) {
      return Err(TransformError {
        path: path.display().to_string(),
        kind: TransformErrorKind::Syntax,
        message: "unexpected token".to_string(),
        location: None,
      });
    }
    self.inner.transform(path, source, options)
  }

  fn cache_key(&self) -> &str {
    "recording@1"
  }
}

pub struct Fixture {
  pub fs: Arc<MemoryFileSystem>,
  pub transformer: Arc<RecordingTransformer>,
  pub session: DeltaSession,
  /// The live end of the injected watcher channel.
  pub events: tokio::sync::mpsc::Sender<WatchEvent>,
}

impl Fixture {
  /// Rewrite a file and report the change, the way the watch backend
  /// would after an edit.
  pub fn edit(&self, path: &str, content: &str) {
    self.fs.add_file(path, content);
    self.session.calculator().on_event(WatchEvent::new(WatchEventKind::Change, path));
  }

  pub fn delete(&self, path: &str) {
    let _ = self.fs.remove_file(Path::new(path));
    self.session.calculator().on_event(WatchEvent::new(WatchEventKind::Delete, path));
  }

  pub fn add(&self, path: &str, content: &str) {
    self.fs.add_file(path, content);
    self.session.calculator().on_event(WatchEvent::new(WatchEventKind::Add, path));
  }
}

pub async fn fixture(files: &[(&str, &str)], entries: &[&str]) -> Fixture {
  fixture_with(files, entries, BundlerOptions::default()).await
}

pub async fn fixture_with(
  files: &[(&str, &str)],
  entries: &[&str],
  mut options: BundlerOptions,
) -> Fixture {
  let fs = Arc::new(MemoryFileSystem::new());
  for (path, content) in files {
    fs.add_file(*path, *content);
  }

  options.entries = Some(entries.iter().map(PathBuf::from).collect());

  let transformer = Arc::new(RecordingTransformer::new());
  let shared_fs: Arc<dyn FileSystem> = fs.clone();
  let bundler = Bundler::with_collaborators(options, shared_fs, transformer.clone())
    .expect("options are valid");

  let (watcher, ready, events) = Watcher::detached();
  ready.send(()).expect("session is waiting for the ready signal");
  let session = bundler.dev_session(watcher).await.expect("watcher reported ready");

  Fixture { fs, transformer, session, events }
}

/// Paths of a delta's `modified` set, sorted for stable assertions.
pub fn modified_paths(delta: &rampack::Delta) -> Vec<String> {
  let mut paths: Vec<String> = delta.modified.keys().map(|path| path.to_string()).collect();
  paths.sort();
  paths
}

pub fn deleted_paths(delta: &rampack::Delta) -> Vec<String> {
  let mut paths: Vec<String> = delta.deleted.iter().map(|path| path.to_string()).collect();
  paths.sort();
  paths
}
