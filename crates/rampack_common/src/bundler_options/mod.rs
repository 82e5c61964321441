pub mod normalized_bundler_options;
pub mod platform;

use std::path::PathBuf;

use crate::Platform;

#[derive(Default, Debug, Clone)]
pub struct BundlerOptions {
  // --- Input
  pub entries: Option<Vec<PathBuf>>,
  pub project_roots: Option<Vec<PathBuf>>,
  pub platform: Option<Platform>,
  pub platforms: Option<Vec<Platform>>,

  // --- Resolution
  pub source_exts: Option<Vec<String>>,
  pub asset_exts: Option<Vec<String>>,
  pub blacklist_re: Option<String>,

  // --- Transform
  pub dev: Option<bool>,
  pub minify: Option<bool>,
  pub max_workers: Option<usize>,
  pub polyfills: Option<Vec<PathBuf>>,

  // --- Cache
  pub cache_dir: Option<PathBuf>,
  pub cache_version: Option<String>,
  pub transformer_key: Option<String>,
  pub cache_budget_bytes: Option<u64>,
  pub reset_cache: Option<bool>,

  // --- Output
  pub source_map_url: Option<String>,
  pub inline_source_map: Option<bool>,
  pub exclude_source: Option<bool>,
}
