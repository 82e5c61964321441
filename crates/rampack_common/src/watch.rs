use crate::ModulePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
  Change,
  Delete,
  Add,
}

/// A path-level event from the injected watch backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
  pub kind: WatchEventKind,
  pub path: ModulePath,
}

impl WatchEvent {
  pub fn new(kind: WatchEventKind, path: impl Into<ModulePath>) -> Self {
    Self { kind, path: path.into() }
  }
}

/// Handle to the external watch backend: a one-shot ready signal awaited at
/// session startup, then a stream of path-level events.
pub struct Watcher {
  pub ready: tokio::sync::oneshot::Receiver<()>,
  pub events: tokio::sync::mpsc::Receiver<WatchEvent>,
}

impl Watcher {
  /// A watcher that is ready immediately and never emits events. One-shot
  /// builds use this; tests drive the returned senders by hand.
  pub fn detached() -> (Self, tokio::sync::oneshot::Sender<()>, tokio::sync::mpsc::Sender<WatchEvent>)
  {
    let (ready_tx, ready) = tokio::sync::oneshot::channel();
    let (events_tx, events) = tokio::sync::mpsc::channel(256);
    (Self { ready, events }, ready_tx, events_tx)
  }
}
