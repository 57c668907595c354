use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use iris_registry::{
  config::{ Config, select_device, DEFAULT_EPOCHS },
  pipeline::{ self, SAMPLE_CLASS },
};


/// Train an Iris classifier, register it and query the registered copy.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
  /// Number of epochs to run
  #[arg(long, default_value_t = DEFAULT_EPOCHS)]
  epochs: usize,

  /// Root directory of the model registry [env: IRIS_TRACKING_URI, default: ./mlruns]
  #[arg(long)]
  tracking_uri: Option<PathBuf>,
}

impl Args {
  /// Flags take precedence over `base`, which carries defaults and the environment.
  fn config(&self, base: Config) -> Config {
    match &self.tracking_uri {
      Some(uri) => base.with_tracking_uri(uri),
      None => base,
    }
  }
}

fn main() -> anyhow::Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
  let args = Args::parse();

  let config = args.config(Config::from_env());

  let device = select_device().context("selecting compute device")?;
  let report = pipeline::run(&config, args.epochs, &device)
    .with_context(|| format!("running pipeline against {}", config.tracking_uri.display()))?;

  println!("\nprediction accuracy {}", report.accuracy);
  if let Some(version) = &report.version {
    println!("registered {} version {}", version.name, version.version);
  }
  println!("PREDICTION VALUE: {:?}", report.prediction);
  println!("Argmax value: {}", report.predicted_class);
  println!("\nPREDICTION RESULT: ACTUAL: {SAMPLE_CLASS}, PREDICTED: {}", report.predicted_name);
  Ok(())
}
