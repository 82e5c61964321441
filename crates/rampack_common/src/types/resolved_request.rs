use crate::ModulePath;

/// A request resolved to a concrete file. `ignored` marks blacklisted
/// targets: the edge stays resolved but the target is never traversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
  pub path: ModulePath,
  pub is_asset: bool,
  pub ignored: bool,
}
