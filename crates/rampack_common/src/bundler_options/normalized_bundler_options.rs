use std::path::PathBuf;

use regex::Regex;
use rustc_hash::FxHashSet;

use crate::Platform;

/// `BundlerOptions` with every default applied. Shared behind an `Arc`
/// across the resolver, the worker pool, and the session driver.
#[derive(Debug)]
pub struct NormalizedBundlerOptions {
  pub entries: Vec<PathBuf>,
  pub project_roots: Vec<PathBuf>,
  pub platform: Option<Platform>,
  pub platforms: FxHashSet<Platform>,

  pub source_exts: Vec<String>,
  pub asset_exts: FxHashSet<String>,
  pub blacklist: Option<Regex>,

  pub dev: bool,
  pub minify: bool,
  pub max_workers: usize,
  pub polyfills: Vec<PathBuf>,

  pub cache_dir: Option<PathBuf>,
  pub cache_version: String,
  pub transformer_key: String,
  pub cache_budget_bytes: u64,
  pub reset_cache: bool,

  pub source_map_url: Option<String>,
  pub inline_source_map: bool,
  pub exclude_source: bool,
}
