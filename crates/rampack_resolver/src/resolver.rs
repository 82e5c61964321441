use std::path::{Path, PathBuf};

use arcstr::ArcStr;
use dashmap::DashMap;
use sugar_path::SugarPath;

use rampack_common::{ModulePath, Platform, ResolvedRequest};
use rampack_error::Unresolved;
use rampack_fs::{FileSystem, OsFileSystem};
use rampack_utils::path_ext::PathExt;

#[derive(Debug, Clone)]
pub struct ResolverOptions {
  pub project_roots: Vec<PathBuf>,
  /// Probe order for source files.
  pub source_exts: Vec<String>,
  /// Extensions accepted as-is, without suffix probing.
  pub asset_exts: rustc_hash::FxHashSet<String>,
  pub blacklist: Option<regex::Regex>,
}

type CacheKey = (ArcStr, ArcStr, Option<Platform>);

/// Maps `(fromFile, request, platform)` to a concrete source file,
/// honoring platform suffixes and the configured extension order.
#[derive(Debug)]
pub struct Resolver<F: FileSystem = OsFileSystem> {
  options: ResolverOptions,
  fs: F,
  cache: DashMap<CacheKey, ResolvedRequest>,
}

impl<F: FileSystem> Resolver<F> {
  pub fn new(options: ResolverOptions, fs: F) -> Self {
    Self { options, fs, cache: DashMap::default() }
  }

  pub fn is_asset(&self, path: &Path) -> bool {
    path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| self.options.asset_exts.contains(ext))
  }

  /// Drop cached resolutions that landed on `path`. Called when the
  /// watcher reports the file deleted.
  pub fn invalidate(&self, path: &str) {
    self.cache.retain(|_, resolved| resolved.path.as_str() != path);
  }

  pub fn resolve(
    &self,
    from: Option<&Path>,
    request: &str,
    platform: Option<Platform>,
  ) -> Result<ResolvedRequest, Unresolved> {
    let from_dir = from.and_then(Path::parent);

    let cache_key: CacheKey = (
      from_dir.map(|dir| ArcStr::from(dir.expect_to_str())).unwrap_or_default(),
      ArcStr::from(request),
      platform,
    );
    if let Some(hit) = self.cache.get(&cache_key) {
      return Ok(hit.clone());
    }

    let is_relative = request.starts_with("./") || request.starts_with("../");
    let bases: Vec<PathBuf> = if is_relative {
      from_dir.map(|dir| dir.join(request).normalize()).into_iter().collect()
    } else if Path::new(request).is_absolute() {
      vec![Path::new(request).normalize()]
    } else {
      self.options.project_roots.iter().map(|root| root.join(request).normalize()).collect()
    };

    let mut candidates = Vec::new();
    for base in &bases {
      if let Some(resolved) = self.probe(base, platform, &mut candidates) {
        self.cache.insert(cache_key, resolved.clone());
        return Ok(resolved);
      }
    }

    Err(Unresolved {
      from: from.map(|path| path.expect_to_str().to_string()).unwrap_or_default(),
      request: request.to_string(),
      candidates: candidates.iter().map(|path| path.expect_to_slash()).collect(),
    })
  }

  fn probe(
    &self,
    base: &Path,
    platform: Option<Platform>,
    candidates: &mut Vec<PathBuf>,
  ) -> Option<ResolvedRequest> {
    if let Some(resolved) = self.probe_file(base, platform, candidates) {
      return Some(resolved);
    }
    if self.fs.is_dir(base) {
      return self.probe_file(&base.join("index"), platform, candidates);
    }
    None
  }

  fn probe_file(
    &self,
    base: &Path,
    platform: Option<Platform>,
    candidates: &mut Vec<PathBuf>,
  ) -> Option<ResolvedRequest> {
    // An asset-extension request wins over source probing and is accepted
    // exactly as written.
    if self.is_asset(base) {
      candidates.push(base.to_path_buf());
      if self.fs.is_file(base) {
        return Some(self.finish(base, true));
      }
      return None;
    }

    candidates.push(base.to_path_buf());
    if self.fs.is_file(base) {
      return Some(self.finish(base, false));
    }

    let base_str = base.expect_to_str();
    for ext in &self.options.source_exts {
      if let Some(platform) = platform {
        let suffixed = PathBuf::from(format!("{base_str}.{platform}.{ext}"));
        candidates.push(suffixed.clone());
        if self.fs.is_file(&suffixed) {
          return Some(self.finish(&suffixed, false));
        }
      }
      let plain = PathBuf::from(format!("{base_str}.{ext}"));
      candidates.push(plain.clone());
      if self.fs.is_file(&plain) {
        return Some(self.finish(&plain, false));
      }
    }

    None
  }

  fn finish(&self, path: &Path, is_asset: bool) -> ResolvedRequest {
    let path_str = path.expect_to_slash();
    let ignored =
      self.options.blacklist.as_ref().is_some_and(|blacklist| blacklist.is_match(&path_str));
    ResolvedRequest { path: ModulePath::new(path_str), is_asset, ignored }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rampack_fs::MemoryFileSystem;

  fn resolver(files: &[&str]) -> Resolver<MemoryFileSystem> {
    let fs = MemoryFileSystem::new();
    for file in files {
      fs.add_file(*file, "0;");
    }
    Resolver::new(
      ResolverOptions {
        project_roots: vec![PathBuf::from("/root")],
        source_exts: vec!["js".to_string(), "json".to_string()],
        asset_exts: ["png".to_string()].into_iter().collect(),
        blacklist: None,
      },
      fs,
    )
  }

  #[test]
  fn platform_suffix_beats_bare_extension() {
    let resolver = resolver(&["/root/foo.ios.js", "/root/foo.js"]);
    let resolved = resolver
      .resolve(Some(Path::new("/root/index.js")), "./foo", Some(Platform::Ios))
      .unwrap();
    assert_eq!(resolved.path.as_str(), "/root/foo.ios.js");

    let resolved = resolver.resolve(Some(Path::new("/root/index.js")), "./foo", None).unwrap();
    assert_eq!(resolved.path.as_str(), "/root/foo.js");
  }

  #[test]
  fn extension_order_is_configured_order() {
    let resolver = resolver(&["/root/data.json", "/root/both.js", "/root/both.json"]);
    let from = Path::new("/root/index.js");

    let resolved = resolver.resolve(Some(from), "./data", None).unwrap();
    assert_eq!(resolved.path.as_str(), "/root/data.json");

    let resolved = resolver.resolve(Some(from), "./both", None).unwrap();
    assert_eq!(resolved.path.as_str(), "/root/both.js");
  }

  #[test]
  fn directory_retries_with_index() {
    let resolver = resolver(&["/root/lib/index.ios.js", "/root/lib/index.js"]);
    let resolved = resolver
      .resolve(Some(Path::new("/root/app.js")), "./lib", Some(Platform::Ios))
      .unwrap();
    assert_eq!(resolved.path.as_str(), "/root/lib/index.ios.js");
  }

  #[test]
  fn asset_accepted_without_suffix_probing() {
    let resolver = resolver(&["/root/logo.png", "/root/logo.png.js"]);
    let resolved = resolver.resolve(Some(Path::new("/root/app.js")), "./logo.png", None).unwrap();
    assert!(resolved.is_asset);
    assert_eq!(resolved.path.as_str(), "/root/logo.png");
  }

  #[test]
  fn bare_requests_probe_project_roots() {
    let resolver = resolver(&["/root/vendor/lib.js"]);
    let resolved = resolver.resolve(Some(Path::new("/elsewhere/app.js")), "vendor/lib", None).unwrap();
    assert_eq!(resolved.path.as_str(), "/root/vendor/lib.js");
  }

  #[test]
  fn unresolved_reports_probed_candidates() {
    let resolver = resolver(&[]);
    let err = resolver
      .resolve(Some(Path::new("/root/app.js")), "./gone", Some(Platform::Android))
      .unwrap_err();
    assert_eq!(err.from, "/root/app.js");
    assert_eq!(err.request, "./gone");
    assert!(err.candidates.contains(&"/root/gone.android.js".to_string()));
    assert!(err.candidates.contains(&"/root/gone.js".to_string()));
  }

  #[test]
  fn blacklisted_target_resolves_as_ignored() {
    let fs = MemoryFileSystem::new();
    fs.add_file("/root/generated/big.js", "0;");
    let resolver = Resolver::new(
      ResolverOptions {
        project_roots: vec![PathBuf::from("/root")],
        source_exts: vec!["js".to_string()],
        asset_exts: rustc_hash::FxHashSet::default(),
        blacklist: Some(regex::Regex::new(r"/generated/").unwrap()),
      },
      fs,
    );

    let resolved =
      resolver.resolve(Some(Path::new("/root/app.js")), "./generated/big", None).unwrap();
    assert!(resolved.ignored);
    assert_eq!(resolved.path.as_str(), "/root/generated/big.js");
  }

  #[test]
  fn invalidate_drops_stale_resolutions() {
    let resolver = resolver(&["/root/foo.js"]);
    let from = Path::new("/root/index.js");
    let resolved = resolver.resolve(Some(from), "./foo", None).unwrap();
    assert_eq!(resolved.path.as_str(), "/root/foo.js");

    resolver.invalidate("/root/foo.js");
    assert!(resolver.cache.is_empty());
  }
}
