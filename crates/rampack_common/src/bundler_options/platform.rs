use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
  Ios,
  Android,
  Web,
}

impl Platform {
  /// The suffix inserted before the source extension (`foo.ios.js`).
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Ios => "ios",
      Self::Android => "android",
      Self::Web => "web",
    }
  }
}

impl std::fmt::Display for Platform {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for Platform {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "ios" => Ok(Self::Ios),
      "android" => Ok(Self::Android),
      "web" => Ok(Self::Web),
      other => Err(format!("unknown platform `{other}`")),
    }
  }
}
