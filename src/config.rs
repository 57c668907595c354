use std::env;
use std::path::PathBuf;

use candle_core::Device;

use crate::error::Result;


/// Name the trained model is registered under. Consumers look it up by this name.
pub const REGISTERED_MODEL_NAME: &str = "demo-reg-model";

pub const DEFAULT_EPOCHS: usize = 100;


/// Settings for one pipeline run.
///
/// Built from [Default], then overridden by the environment
/// ([Config::from_env]) and finally by command line flags.

#[derive(Debug, Clone)]
pub struct Config {
  pub tracking_uri: PathBuf,
  pub registered_model_name: String,
  pub seed: u64,
  pub learning_rate: f64,
  pub test_size: f32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      tracking_uri: PathBuf::from("./mlruns"),
      registered_model_name: REGISTERED_MODEL_NAME.to_string(),
      seed: 42,
      learning_rate: 0.01,
      test_size: 0.2,
    }
  }
}

impl Config {
  pub fn from_env() -> Self {
    Self::from_lookup(|key: &str| env::var(key).ok() )
  }

  /// Defaults overridden by whatever `lookup` returns for `IRIS_TRACKING_URI`
  /// and `IRIS_SEED`. Empty values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let var = |key: &str| lookup(key).filter(|value| !value.is_empty() );
    let mut config = Self::default();
    if let Some(uri) = var("IRIS_TRACKING_URI") {
      config.tracking_uri = PathBuf::from(uri);
    }
    if let Some(seed) = var("IRIS_SEED") {
      match seed.parse() {
        Ok(seed) => config.seed = seed,
        Err(_) => log::warn!("ignoring IRIS_SEED={seed:?}, not an unsigned integer"),
      }
    }
    config
  }

  pub fn with_tracking_uri(mut self, uri: impl Into<PathBuf>) -> Self {
    self.tracking_uri = uri.into();
    self
  }
}


/// Compute device for this process. Picks the first CUDA device when
/// candle was built with CUDA support and one is present.

pub fn select_device() -> Result<Device> {
  let device = Device::cuda_if_available(0)?;
  log::debug!("using device {device:?}");
  Ok(device)
}
