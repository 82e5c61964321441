use std::sync::Arc;

use rustc_hash::FxHashSet;

use rampack_common::{BundlerOptions, NormalizedBundlerOptions, Platform};
use rampack_error::BuildResult;

const DEFAULT_CACHE_BUDGET_BYTES: u64 = 128 * 1024 * 1024;

pub fn normalize_options(raw: BundlerOptions) -> BuildResult<Arc<NormalizedBundlerOptions>> {
  let blacklist = match &raw.blacklist_re {
    Some(pattern) => Some(
      regex::Regex::new(pattern)
        .map_err(|err| anyhow::anyhow!("invalid blacklistRE `{pattern}` - {err}"))?,
    ),
    None => None,
  };

  let platforms: FxHashSet<Platform> = raw
    .platforms
    .map(|platforms| platforms.into_iter().collect())
    .unwrap_or_else(|| [Platform::Ios, Platform::Android, Platform::Web].into_iter().collect());
  if let Some(platform) = raw.platform {
    if !platforms.contains(&platform) {
      Err(anyhow::anyhow!("platform `{platform}` is not in the configured platform set"))?;
    }
  }

  let max_workers = raw.max_workers.unwrap_or_else(|| {
    std::thread::available_parallelism().map(|cores| (cores.get() / 2).max(1)).unwrap_or(1)
  });

  Ok(Arc::new(NormalizedBundlerOptions {
    entries: raw.entries.unwrap_or_default(),
    project_roots: raw.project_roots.unwrap_or_default(),
    platform: raw.platform,
    platforms,
    source_exts: raw
      .source_exts
      .unwrap_or_else(|| vec!["js".to_string(), "jsx".to_string(), "json".to_string()]),
    asset_exts: raw
      .asset_exts
      .map(|exts| exts.into_iter().collect())
      .unwrap_or_else(|| {
        ["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg", "ttf", "otf", "mp3", "mp4"]
          .into_iter()
          .map(str::to_string)
          .collect()
      }),
    blacklist,
    dev: raw.dev.unwrap_or(true),
    minify: raw.minify.unwrap_or(false),
    max_workers,
    polyfills: raw.polyfills.unwrap_or_default(),
    cache_dir: raw.cache_dir,
    cache_version: raw.cache_version.unwrap_or_else(|| "1".to_string()),
    transformer_key: raw.transformer_key.unwrap_or_default(),
    cache_budget_bytes: raw.cache_budget_bytes.unwrap_or(DEFAULT_CACHE_BUDGET_BYTES),
    reset_cache: raw.reset_cache.unwrap_or(false),
    source_map_url: raw.source_map_url,
    inline_source_map: raw.inline_source_map.unwrap_or(false),
    exclude_source: raw.exclude_source.unwrap_or(false),
  }))
}
