use rustc_hash::{FxHashMap, FxHashSet};

use crate::{Module, ModulePath};

/// The minimal change set between two epochs of a session. `modified`
/// carries the current state of added-or-changed modules, not a field-level
/// diff; `reset` tells the client to drop its mirror and replay.
#[derive(Debug, Clone, Default)]
pub struct Delta {
  pub modified: FxHashMap<ModulePath, Module>,
  pub deleted: FxHashSet<ModulePath>,
  pub reset: bool,
}

impl Delta {
  pub fn is_empty(&self) -> bool {
    self.modified.is_empty() && self.deleted.is_empty() && !self.reset
  }
}
