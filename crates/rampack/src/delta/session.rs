use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rampack_common::{Delta, Module, ModulePath, ModuleType, Watcher};
use rampack_error::{BuildResult, WatcherTimeout};
use rampack_utils::indexmap::FxIndexMap;

use crate::delta::DeltaCalculator;
use crate::module_id::IdAllocator;
use crate::serializers::delta_json::{build_response, DeltaResponse};
use crate::serializers::file_ram::{serialize_file_ram, FileRamBundle};
use crate::serializers::plain::{serialize_plain, PlainBundle};
use crate::serializers::ram_bundle::{serialize_indexed_ram, IndexedRamBundle};
use crate::serializers::{require_call_modules, SerializeOptions};
use crate::types::SharedFs;

/// The watcher must report ready before the first build; a backend that
/// never settles is a startup failure, not a hang.
const WATCHER_READY_TIMEOUT: Duration = Duration::from_secs(120);

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A long-lived development session: owns the calculator, the watcher
/// intake, the prelude scripts, and the epoch ids echoed to clients as
/// `deltaBundleId`.
pub struct DeltaSession {
  calculator: DeltaCalculator,
  allocator: Arc<IdAllocator>,
  prelude: Vec<Module>,
  session_tag: u64,
  epoch: AtomicU64,
  current_epoch_id: Mutex<String>,
  intake: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl DeltaSession {
  pub(crate) async fn new(
    calculator: DeltaCalculator,
    prelude: Vec<Module>,
    watcher: Watcher,
  ) -> BuildResult<Self> {
    let Watcher { ready, mut events } = watcher;
    match tokio::time::timeout(WATCHER_READY_TIMEOUT, ready).await {
      Ok(Ok(())) => {}
      _ => Err(anyhow::Error::new(WatcherTimeout))?,
    }

    let intake_calculator = calculator.clone();
    let intake = tokio::spawn(async move {
      while let Some(event) = events.recv().await {
        intake_calculator.on_event(event);
      }
    });

    let allocator = calculator.allocator();
    let session_tag = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
    Ok(Self {
      calculator,
      allocator,
      prelude,
      session_tag,
      epoch: AtomicU64::new(0),
      current_epoch_id: Mutex::new(format!("rampack-{session_tag}-0")),
      intake: Mutex::new(Some(intake)),
    })
  }

  pub fn calculator(&self) -> &DeltaCalculator {
    &self.calculator
  }

  pub fn current_epoch_id(&self) -> String {
    self.current_epoch_id.lock().expect("epoch lock poisoned").clone()
  }

  pub async fn get_delta(&self, reset: bool) -> BuildResult<Delta> {
    self.calculator.get_delta(reset).await
  }

  /// The delta wire response for a client that last saw `client_epoch`.
  /// A missing or stale epoch forces a reset replay.
  pub async fn delta_response(&self, client_epoch: Option<&str>) -> BuildResult<DeltaResponse> {
    let reset = client_epoch.map_or(true, |epoch| epoch != self.current_epoch_id());
    let delta = self.calculator.get_delta(reset).await?;

    let epoch_id = if delta.is_empty() {
      self.current_epoch_id()
    } else {
      let next = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
      let id = format!("rampack-{}-{next}", self.session_tag);
      *self.current_epoch_id.lock().expect("epoch lock poisoned") = id.clone();
      id
    };

    let graph = self.calculator.graph().await;
    let post = require_call_modules(&graph, &self.allocator);
    Ok(build_response(epoch_id, &delta, &self.prelude, &post, &self.allocator))
  }

  pub async fn plain_bundle(&self, options: &SerializeOptions) -> BuildResult<PlainBundle> {
    self.calculator.get_delta(false).await?;
    let graph = self.calculator.graph().await;
    Ok(serialize_plain(&graph, &self.prelude, &self.allocator, options))
  }

  pub async fn indexed_ram_bundle(
    &self,
    options: &SerializeOptions,
  ) -> BuildResult<IndexedRamBundle> {
    self.calculator.get_delta(false).await?;
    let graph = self.calculator.graph().await;
    Ok(serialize_indexed_ram(&graph, &self.prelude, &self.allocator, options))
  }

  pub async fn file_ram_bundle(
    &self,
    fs: &SharedFs,
    out_dir: &std::path::Path,
  ) -> BuildResult<FileRamBundle> {
    self.calculator.get_delta(false).await?;
    let graph = self.calculator.graph().await;
    serialize_file_ram(&graph, &self.prelude, &self.allocator, fs, out_dir)
  }

  /// Ends the session: detaches the watcher intake and abandons in-flight
  /// work. The graph stays readable. Idempotent.
  pub fn end(&self) {
    self.calculator.end();
    if let Some(intake) = self.intake.lock().expect("intake lock poisoned").take() {
      intake.abort();
    }
  }
}

impl Drop for DeltaSession {
  fn drop(&mut self) {
    self.end();
  }
}

/// Script-typed prelude modules from the configured polyfill paths,
/// loaded once at session start and emitted verbatim before everything.
pub(crate) fn load_prelude(
  fs: &SharedFs,
  polyfills: &[std::path::PathBuf],
  allocator: &IdAllocator,
) -> BuildResult<Vec<Module>> {
  let mut prelude = Vec::with_capacity(polyfills.len());
  for polyfill in polyfills {
    let code = fs
      .read_to_string(polyfill)
      .map_err(|err| anyhow::anyhow!("Could not load polyfill {} - {err}", polyfill.display()))?;
    let path = ModulePath::from(polyfill.to_string_lossy().into_owned());
    prelude.push(Module {
      output_id: allocator.id_of(&path),
      path,
      module_type: ModuleType::Script,
      code,
      map: None,
      dependencies: FxIndexMap::default(),
      inverse_dependencies: Default::default(),
    });
  }
  Ok(prelude)
}
