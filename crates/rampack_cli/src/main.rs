mod args;

use std::time::Instant;

use ansi_term::Colour;
use args::{BundleFormat, InputArgs, OutputArgs, TransformArgs};
use clap::Parser;

use rampack::{Bundler, BundlerOptions, SerializeOptions};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Commands {
  #[clap(flatten)]
  input: InputArgs,

  #[clap(flatten)]
  output: OutputArgs,

  #[clap(flatten)]
  transform: TransformArgs,
}

fn print_outputs(outputs: Vec<(String, usize)>) {
  let width = outputs.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
  for (name, size) in outputs {
    println!(
      "{:width$}  {}",
      Colour::Green.paint(name),
      Colour::White.dimmed().paint(format!("{:.2} kB", size as f64 / 1024.0)),
    );
  }
}

fn exit_with(errors: rampack::BuildError) -> ! {
  for error in errors.iter() {
    eprintln!("{} {error:#}", Colour::Red.bold().paint("error:"));
  }
  std::process::exit(1);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let commands = Commands::parse();

  let platform = match commands.input.platform.as_deref().map(str::parse::<rampack::Platform>) {
    Some(Ok(platform)) => Some(platform),
    Some(Err(message)) => {
      eprintln!("{} {message}", Colour::Red.bold().paint("error:"));
      std::process::exit(1);
    }
    None => None,
  };

  let options = BundlerOptions {
    entries: Some(commands.input.entry),
    project_roots: Some(commands.input.root),
    platform,
    dev: commands.transform.dev,
    minify: commands.transform.minify,
    max_workers: commands.transform.max_workers,
    polyfills: Some(commands.transform.polyfill),
    blacklist_re: commands.transform.blacklist,
    cache_dir: commands.transform.cache_dir,
    cache_version: commands.transform.cache_version,
    reset_cache: Some(commands.transform.reset_cache),
    source_map_url: commands.output.source_map_url.clone(),
    inline_source_map: Some(commands.output.inline_source_map),
    exclude_source: Some(commands.output.exclude_source),
    ..Default::default()
  };

  let bundler = match Bundler::new(options) {
    Ok(bundler) => bundler,
    Err(errors) => exit_with(errors),
  };

  let start = Instant::now();
  let built = match bundler.build().await {
    Ok(built) => built,
    Err(errors) => exit_with(errors),
  };

  let serialize_options = SerializeOptions {
    source_map_url: commands.output.source_map_url,
    inline_source_map: commands.output.inline_source_map,
    exclude_source: commands.output.exclude_source,
  };

  let out = commands.output.out;
  let mut outputs: Vec<(String, usize)> = Vec::new();
  match commands.output.format {
    BundleFormat::Plain => {
      let bundle = built.to_plain(&serialize_options);
      let map_path = out.with_extension("js.map");
      if let Err(err) = std::fs::write(&out, &bundle.code) {
        exit_with(anyhow::anyhow!("could not write {} - {err}", out.display()).into());
      }
      if let Err(err) = std::fs::write(&map_path, &bundle.map) {
        exit_with(anyhow::anyhow!("could not write {} - {err}", map_path.display()).into());
      }
      outputs.push((out.display().to_string(), bundle.code.len()));
      outputs.push((map_path.display().to_string(), bundle.map.len()));
    }
    BundleFormat::IndexedRam => {
      let bundle = built.to_indexed_ram(&serialize_options);
      let map_path = out.with_extension("js.map");
      if let Err(err) = std::fs::write(&out, &bundle.bytes) {
        exit_with(anyhow::anyhow!("could not write {} - {err}", out.display()).into());
      }
      if let Err(err) = std::fs::write(&map_path, &bundle.map) {
        exit_with(anyhow::anyhow!("could not write {} - {err}", map_path.display()).into());
      }
      outputs.push((out.display().to_string(), bundle.bytes.len()));
      outputs.push((map_path.display().to_string(), bundle.map.len()));
    }
    BundleFormat::FileRam => {
      let bundle = match built.write_file_ram(&out) {
        Ok(bundle) => bundle,
        Err(errors) => exit_with(errors),
      };
      for file in bundle.written {
        let size = std::fs::metadata(&file).map(|meta| meta.len() as usize).unwrap_or(0);
        outputs.push((file.display().to_string(), size));
      }
    }
  }

  print_outputs(outputs);
  println!(
    "{} in {}ms",
    Colour::Green.bold().paint("Bundled"),
    start.elapsed().as_millis()
  );
}
