use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, watch};

use rampack_cache::{canonical_options_json, CacheKey, TransformCache};
use rampack_common::{ModulePath, TransformOptions, TransformerOutput};
use rampack_error::TransformError;

use crate::types::SharedTransformer;

/// Scheduling class for a transform job. Entry-point modules jump the
/// queue; everything else is FIFO behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
  Entry,
  Normal,
}

type TransformResult = Result<TransformerOutput, TransformError>;

enum SchedulerMsg {
  Acquire { priority: Priority, grant: oneshot::Sender<()> },
  Release,
  Close,
}

/// Runs transforms on blocking worker threads with bounded parallelism
/// and single-flight coalescing per cache key: concurrent callers with
/// the same key await one in-progress transform, and the first completion
/// populates the cache for all of them.
#[derive(Clone)]
pub struct TransformPool {
  inner: Arc<PoolInner>,
}

struct PoolInner {
  transformer: SharedTransformer,
  cache: Arc<TransformCache>,
  /// `transformerKey ∥ cacheVersion ∥ transformer identity`, mixed into
  /// every cache key.
  cache_token: String,
  scheduler: mpsc::UnboundedSender<SchedulerMsg>,
  inflight: DashMap<CacheKey, watch::Receiver<Option<TransformResult>>>,
  closed: AtomicBool,
}

impl TransformPool {
  /// Must be called from within a tokio runtime; the scheduler runs as a
  /// background task for the lifetime of the pool.
  pub fn new(
    transformer: SharedTransformer,
    cache: Arc<TransformCache>,
    cache_token: String,
    workers: usize,
  ) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_scheduler(rx, workers.max(1)));

    Self {
      inner: Arc::new(PoolInner {
        transformer,
        cache,
        cache_token,
        scheduler: tx,
        inflight: DashMap::default(),
        closed: AtomicBool::new(false),
      }),
    }
  }

  /// Abandons queued and in-flight work: queued jobs fail immediately and
  /// running transforms have their results discarded without touching the
  /// cache. Idempotent.
  pub fn close(&self) {
    self.inner.closed.store(true, Ordering::SeqCst);
    let _ = self.inner.scheduler.send(SchedulerMsg::Close);
  }

  pub fn is_closed(&self) -> bool {
    self.inner.closed.load(Ordering::SeqCst)
  }

  pub async fn transform(
    &self,
    path: &ModulePath,
    source: &str,
    options: &TransformOptions,
    priority: Priority,
  ) -> TransformResult {
    let inner = &self.inner;
    if inner.closed.load(Ordering::SeqCst) {
      return Err(TransformError::cancelled(path.as_str()));
    }

    let key =
      CacheKey::new(source.as_bytes(), &inner.cache_token, &canonical_options_json(options));
    if let Some(hit) = inner.cache.get(&key) {
      return Ok(hit);
    }

    loop {
      // Follower: somebody is already transforming this key.
      if let Some(rx) = inner.inflight.get(&key).map(|entry| entry.value().clone()) {
        let mut rx = rx;
        loop {
          let published = rx.borrow().clone();
          if let Some(result) = published {
            return result;
          }
          if rx.changed().await.is_err() {
            // The leader was dropped without publishing; race for the
            // vacated slot.
            if inner.closed.load(Ordering::SeqCst) {
              return Err(TransformError::cancelled(path.as_str()));
            }
            break;
          }
        }
        continue;
      }

      // Leader: claim the key, run the job, publish for followers.
      let (result_tx, result_rx) = watch::channel(None);
      match inner.inflight.entry(key.clone()) {
        Entry::Occupied(_) => continue,
        Entry::Vacant(vacant) => {
          vacant.insert(result_rx);
        }
      }
      let _inflight = InflightGuard { inner: Arc::clone(inner), key: key.clone() };

      let result = self.run_leader(path, source, options, priority, &key).await;
      let _ = result_tx.send(Some(result.clone()));
      return result;
    }
  }

  async fn run_leader(
    &self,
    path: &ModulePath,
    source: &str,
    options: &TransformOptions,
    priority: Priority,
    key: &CacheKey,
  ) -> TransformResult {
    let inner = &self.inner;

    let (grant_tx, grant_rx) = oneshot::channel();
    if inner.scheduler.send(SchedulerMsg::Acquire { priority, grant: grant_tx }).is_err() {
      return Err(TransformError::cancelled(path.as_str()));
    }
    if grant_rx.await.is_err() {
      return Err(TransformError::cancelled(path.as_str()));
    }
    let _slot = SlotGuard { scheduler: inner.scheduler.clone() };

    if inner.closed.load(Ordering::SeqCst) {
      return Err(TransformError::cancelled(path.as_str()));
    }

    let transformer = Arc::clone(&inner.transformer);
    let job_path = path.to_string();
    let job_source = source.to_string();
    let job_options = options.clone();
    let joined = tokio::task::spawn_blocking(move || {
      transformer.transform(Path::new(&job_path), &job_source, &job_options)
    })
    .await;

    let result = match joined {
      Ok(result) => result,
      Err(_) => return Err(TransformError::cancelled(path.as_str())),
    };

    if inner.closed.load(Ordering::SeqCst) {
      // The session ended mid-transform: discard, no cache write.
      return Err(TransformError::cancelled(path.as_str()));
    }

    if let Ok(output) = &result {
      inner.cache.put(key.clone(), output.clone());
    }
    result
  }
}

/// Clears the single-flight slot even when the leader future is dropped,
/// so followers can re-claim the key instead of waiting forever.
struct InflightGuard {
  inner: Arc<PoolInner>,
  key: CacheKey,
}

impl Drop for InflightGuard {
  fn drop(&mut self) {
    self.inner.inflight.remove(&self.key);
  }
}

/// Returns the worker slot on drop, including when the job is cancelled.
struct SlotGuard {
  scheduler: mpsc::UnboundedSender<SchedulerMsg>,
}

impl Drop for SlotGuard {
  fn drop(&mut self) {
    let _ = self.scheduler.send(SchedulerMsg::Release);
  }
}

async fn run_scheduler(mut rx: mpsc::UnboundedReceiver<SchedulerMsg>, workers: usize) {
  let mut active = 0usize;
  let mut entry_queue: VecDeque<oneshot::Sender<()>> = VecDeque::new();
  let mut normal_queue: VecDeque<oneshot::Sender<()>> = VecDeque::new();

  while let Some(msg) = rx.recv().await {
    match msg {
      SchedulerMsg::Acquire { priority, grant } => {
        if active < workers {
          if grant.send(()).is_ok() {
            active += 1;
          }
        } else {
          match priority {
            Priority::Entry => entry_queue.push_back(grant),
            Priority::Normal => normal_queue.push_back(grant),
          }
        }
      }
      SchedulerMsg::Release => loop {
        match entry_queue.pop_front().or_else(|| normal_queue.pop_front()) {
          Some(grant) => {
            if grant.send(()).is_ok() {
              break;
            }
            // The waiter gave up; hand the slot to the next one.
          }
          None => {
            active = active.saturating_sub(1);
            break;
          }
        }
      },
      SchedulerMsg::Close => {
        entry_queue.clear();
        normal_queue.clear();
      }
    }
  }
}
