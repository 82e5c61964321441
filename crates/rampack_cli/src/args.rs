use std::path::PathBuf;

use clap::Args;

#[derive(Args)]
pub struct InputArgs {
  #[clap(long, action = clap::ArgAction::Append)]
  pub entry: Vec<PathBuf>,

  #[clap(long, action = clap::ArgAction::Append)]
  pub root: Vec<PathBuf>,

  #[clap(long, short)]
  pub platform: Option<String>,
}

#[derive(Args)]
pub struct OutputArgs {
  #[clap(long, short = 'o', default_value = "bundle.js")]
  pub out: PathBuf,

  #[clap(long, value_enum, default_value = "plain")]
  pub format: BundleFormat,

  #[clap(long)]
  pub source_map_url: Option<String>,

  #[clap(long)]
  pub inline_source_map: bool,

  #[clap(long)]
  pub exclude_source: bool,
}

#[derive(Args)]
pub struct TransformArgs {
  #[clap(long)]
  pub dev: Option<bool>,

  #[clap(long, short = 'm')]
  pub minify: Option<bool>,

  #[clap(long)]
  pub max_workers: Option<usize>,

  #[clap(long, action = clap::ArgAction::Append)]
  pub polyfill: Vec<PathBuf>,

  #[clap(long)]
  pub blacklist: Option<String>,

  #[clap(long)]
  pub cache_dir: Option<PathBuf>,

  #[clap(long)]
  pub cache_version: Option<String>,

  #[clap(long)]
  pub reset_cache: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
  Plain,
  IndexedRam,
  FileRam,
}
