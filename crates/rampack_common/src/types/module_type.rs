/// Emission class of a module. `Script` code runs before any `Module`
/// registers; `RequireCall` code runs last, after the whole table is
/// wired; `Comment` bodies are emitted verbatim and register nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleType {
  Script,
  Module,
  RequireCall,
  Asset,
  Comment,
}

impl ModuleType {
  /// Whether this module participates in the indexed RAM module table.
  pub fn is_indexed(&self) -> bool {
    matches!(self, Self::Module)
  }
}
