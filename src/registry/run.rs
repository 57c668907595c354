use std::fmt::Display;
use std::fs::{ self, OpenOptions };
use std::io::Write;
use std::path::PathBuf;

use rand::Rng;
use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  evaluate::Signature,
  graph::{ self, Graph },
  registry::{
    Tracking,
    model::{ LoggedModel, ModelMeta, FLAVOR, MODEL_DATA_FILE, MODEL_META_FILE },
    store::{ self, now_ms, validate_name, validate_artifact_path },
  },
};


pub const RUN_META_FILE: &str = "meta.json";


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
  Running,
  Finished,
  Failed,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
  pub run_id: String,
  pub experiment_id: String,
  pub status: RunStatus,
  pub start_time: u64,
  pub end_time: Option<u64>,
  pub artifact_uri: PathBuf,
}


/// A run that is being recorded.
///
/// Call [finish](ActiveRun::finish) once everything is logged. A run dropped
/// without finishing is marked [failed](RunStatus::Failed).

#[derive(Debug)]
pub struct ActiveRun<'a> {
  tracking: &'a Tracking,
  info: RunInfo,
  dir: PathBuf,
  ended: bool,
}

impl<'a> ActiveRun<'a> {
  pub(super) fn start(tracking: &'a Tracking, experiment_id: &str) -> Result<Self> {
    let run_id = format!("{:032x}", rand::thread_rng().gen::<u128>());
    let dir = tracking.root().join(experiment_id).join(&run_id);
    let info = RunInfo {
      run_id,
      experiment_id: experiment_id.to_string(),
      status: RunStatus::Running,
      start_time: now_ms(),
      end_time: None,
      artifact_uri: dir.join("artifacts"),
    };

    for sub in ["params", "metrics", "artifacts"] {
      store::create_dir(&dir.join(sub))?;
    }
    store::write_json(&dir.join(RUN_META_FILE), &info)?;
    log::info!("started run {} in experiment {experiment_id}", info.run_id);

    Ok(Self { tracking, info, dir, ended: false })
  }

  pub fn info(&self) -> &RunInfo {
    &self.info
  }

  pub fn id(&self) -> &str {
    &self.info.run_id
  }

  pub fn log_param(&self, key: &str, value: impl Display) -> Result<()> {
    validate_name(key)?;
    let path = self.dir.join("params").join(key);
    fs::write(&path, value.to_string()).map_err(Error::io(&path))
  }

  /// Append one `<timestamp> <value> <step>` line to the metric's history.
  pub fn log_metric(&self, key: &str, value: f64, step: u64) -> Result<()> {
    validate_name(key)?;
    let path = self.dir.join("metrics").join(key);
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&path)
      .map_err(Error::io(&path))?;
    writeln!(file, "{} {value} {step}", now_ms()).map_err(Error::io(&path))
  }

  pub fn artifact_uri(&self, artifact_path: &str) -> PathBuf {
    self.info.artifact_uri.join(artifact_path)
  }

  /// Store `graph` under `artifact_path` and optionally register it as a new
  /// version of `registered_model_name`.
  pub fn log_model(
    &self,
    graph: &Graph,
    artifact_path: &str,
    signature: &Signature,
    registered_model_name: Option<&str>,
  ) -> Result<LoggedModel> {
    validate_artifact_path(artifact_path)?;
    let dir = self.artifact_uri(artifact_path);
    let data = dir.join(MODEL_DATA_FILE);
    if let Some(parent) = data.parent() {
      store::create_dir(parent)?;
    }
    graph.save(&data)?;

    let meta = ModelMeta {
      run_id: self.info.run_id.clone(),
      artifact_path: artifact_path.to_string(),
      flavor: FLAVOR.to_string(),
      format: graph::FORMAT,
      data: MODEL_DATA_FILE.to_string(),
      utc_time_created: now_ms(),
      signature: signature.clone(),
    };
    store::write_json(&dir.join(MODEL_META_FILE), &meta)?;
    log::info!("logged {graph} to {}", dir.display());

    let version = registered_model_name
      .map(|name| self.tracking.register_model(name, &dir, &self.info.run_id) )
      .transpose()?;

    Ok(LoggedModel {
      model_uri: format!("runs:/{}/{artifact_path}", self.info.run_id),
      artifact_uri: dir,
      version,
    })
  }

  /// Mark the run finished and return its final record.
  pub fn finish(mut self) -> Result<RunInfo> {
    self.end(RunStatus::Finished)?;
    Ok(self.info.clone())
  }

  fn end(&mut self, status: RunStatus) -> Result<()> {
    self.ended = true;
    self.info.status = status;
    self.info.end_time = Some(now_ms());
    store::write_json(&self.dir.join(RUN_META_FILE), &self.info)
  }
}

impl Drop for ActiveRun<'_> {
  fn drop(&mut self) {
    if self.ended { return }
    log::warn!("run {} ended without finishing", self.info.run_id);
    if let Err(err) = self.end(RunStatus::Failed) {
      log::error!("could not mark run {} failed: {err}", self.info.run_id);
    }
  }
}
