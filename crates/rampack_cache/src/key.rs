use sha1::{Digest, Sha1};

/// `sha1(sourceBytes ∥ transformerCacheKey ∥ canonicalJson(options))`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 20]);

impl CacheKey {
  pub fn new(source: &[u8], transformer_key: &str, options_json: &str) -> Self {
    let mut hasher = Sha1::new();
    hasher.update(source);
    hasher.update(transformer_key.as_bytes());
    hasher.update(options_json.as_bytes());
    Self(hasher.finalize().into())
  }

  pub fn to_hex(&self) -> String {
    let mut hex = String::with_capacity(40);
    for byte in self.0 {
      hex.push_str(&format!("{byte:02x}"));
    }
    hex
  }
}

/// Canonical JSON for the options part of the key: serde serializes struct
/// fields in declaration order, which is stable for a fixed build.
pub fn canonical_options_json<T: serde::Serialize>(options: &T) -> String {
  serde_json::to_string(options).expect("transform options are always serializable")
}
