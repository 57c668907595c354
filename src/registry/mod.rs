//! Local experiment tracking and model registry.
//!
//! Runs, their parameters, metrics and artifacts, as well as registered models
//! and their versions, are kept in a plain directory tree:
//!
//! ```text
//! <root>/<experiment_id>/meta.json
//! <root>/<experiment_id>/<run_id>/meta.json
//! <root>/<experiment_id>/<run_id>/params/<key>
//! <root>/<experiment_id>/<run_id>/metrics/<key>
//! <root>/<experiment_id>/<run_id>/artifacts/<path>/MLmodel
//! <root>/<experiment_id>/<run_id>/artifacts/<path>/data/model.nn
//! <root>/models/<name>/meta.json
//! <root>/models/<name>/version-<n>/meta.json
//! ```

use std::fs;
use std::path::{ Path, PathBuf };

use candle_core::Device;
use serde::{ Serialize, Deserialize };

mod model;
mod run;
mod store;

pub use model::{ LoggedModel, ModelMeta, ModelUri, ModelVersion, RegisteredModel, VersionSelector };
pub use run::{ ActiveRun, RunInfo, RunStatus };

use crate::{
  error::{ Error, Result },
  graph::{ self, Graph },
};
use model::{ FLAVOR, MODEL_META_FILE };
use run::RUN_META_FILE;
use store::{ now_ms, validate_name };


pub const DEFAULT_EXPERIMENT_ID: &str = "0";
const MODELS_DIR: &str = "models";
const META_FILE: &str = "meta.json";


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
  pub experiment_id: String,
  pub name: String,
  pub artifact_location: PathBuf,
  pub creation_time: u64,
}


/// Handle to a tracking root directory.

#[derive(Debug, Clone)]
pub struct Tracking {
  root: PathBuf,
}

impl Tracking {
  /// Open (creating if necessary) the store at `root`, together with its default experiment.
  pub fn open(root: impl AsRef<Path>) -> Result<Self> {
    let root = root.as_ref();
    store::create_dir(root)?;
    let root = fs::canonicalize(root).map_err(Error::io(root))?;
    let tracking = Self { root };
    tracking.ensure_experiment(DEFAULT_EXPERIMENT_ID, "Default")?;
    Ok(tracking)
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn ensure_experiment(&self, experiment_id: &str, name: &str) -> Result<Experiment> {
    let dir = self.root.join(experiment_id);
    let meta = dir.join(META_FILE);
    if meta.exists() {
      return store::read_json(&meta)
    }
    store::create_dir(&dir)?;
    let experiment = Experiment {
      experiment_id: experiment_id.to_string(),
      name: name.to_string(),
      artifact_location: dir.clone(),
      creation_time: now_ms(),
    };
    store::write_json(&meta, &experiment)?;
    Ok(experiment)
  }

  pub fn start_run(&self) -> Result<ActiveRun<'_>> {
    ActiveRun::start(self, DEFAULT_EXPERIMENT_ID)
  }

  fn run_dir(&self, run_id: &str) -> Result<PathBuf> {
    validate_name(run_id)?;
    let entries = fs::read_dir(&self.root).map_err(Error::io(&self.root))?;
    for entry in entries {
      let entry = entry.map_err(Error::io(&self.root))?;
      if entry.file_name() == MODELS_DIR { continue }
      let dir = entry.path().join(run_id);
      if dir.join(RUN_META_FILE).is_file() {
        return Ok(dir)
      }
    }
    Err(Error::NotFound(format!("run {run_id}")))
  }

  pub fn get_run(&self, run_id: &str) -> Result<RunInfo> {
    store::read_json(&self.run_dir(run_id)?.join(RUN_META_FILE))
  }

  fn model_dir(&self, name: &str) -> Result<PathBuf> {
    validate_name(name)?;
    Ok(self.root.join(MODELS_DIR).join(name))
  }

  pub fn get_registered_model(&self, name: &str) -> Result<RegisteredModel> {
    let meta = self.model_dir(name)?.join(META_FILE);
    if !meta.is_file() {
      return Err(Error::NotFound(format!("registered model {name}")))
    }
    store::read_json(&meta)
  }

  pub fn get_model_version(&self, name: &str, version: u32) -> Result<ModelVersion> {
    let meta = self.model_dir(name)?.join(format!("version-{version}")).join(META_FILE);
    if !meta.is_file() {
      return Err(Error::NotFound(format!("version {version} of model {name}")))
    }
    store::read_json(&meta)
  }

  /// Add the artifact at `source` as the next version of `name`,
  /// creating the registered model on first use. Versions count up from 1.
  pub fn register_model(&self, name: &str, source: &Path, run_id: &str) -> Result<ModelVersion> {
    let dir = self.model_dir(name)?;
    let now = now_ms();
    let mut registered = match self.get_registered_model(name) {
      Ok(registered) => registered,
      Err(Error::NotFound(_)) => {
        store::create_dir(&dir)?;
        log::info!("successfully registered model '{name}'");
        RegisteredModel {
          name: name.to_string(),
          creation_timestamp: now,
          last_updated_timestamp: now,
          latest_version: 0,
        }
      },
      Err(err) => return Err(err),
    };

    let version = ModelVersion {
      name: name.to_string(),
      version: registered.latest_version + 1,
      source: source.to_path_buf(),
      run_id: run_id.to_string(),
      creation_timestamp: now,
    };
    let version_dir = dir.join(format!("version-{}", version.version));
    store::create_dir(&version_dir)?;
    store::write_json(&version_dir.join(META_FILE), &version)?;

    registered.latest_version = version.version;
    registered.last_updated_timestamp = now;
    store::write_json(&dir.join(META_FILE), &registered)?;

    log::info!("created version '{}' of model '{name}'", version.version);
    Ok(version)
  }

  /// Artifact directory a model URI points to.
  pub fn resolve(&self, uri: &str) -> Result<PathBuf> {
    let dir = match ModelUri::parse(uri)? {
      ModelUri::Path(path) => path,
      ModelUri::Run { run_id, artifact_path } => self.get_run(&run_id)?.artifact_uri.join(artifact_path),
      ModelUri::Registered { name, version } => {
        let number = match version {
          VersionSelector::Latest => self.get_registered_model(&name)?.latest_version,
          VersionSelector::Number(n) => n,
        };
        self.get_model_version(&name, number)?.source
      },
    };
    if !dir.join(MODEL_META_FILE).is_file() {
      return Err(Error::NotFound(format!("model at {uri}")))
    }
    Ok(dir)
  }

  pub fn read_model_meta(&self, uri: &str) -> Result<ModelMeta> {
    store::read_json(&self.resolve(uri)?.join(MODEL_META_FILE))
  }

  /// Load a logged graph back onto `device`.
  pub fn load_model(&self, uri: &str, device: &Device) -> Result<Graph> {
    let dir = self.resolve(uri)?;
    let meta: ModelMeta = store::read_json(&dir.join(MODEL_META_FILE))?;
    if meta.flavor != FLAVOR {
      return Err(Error::InvalidGraph(format!("unknown model flavor {:?}", meta.flavor)))
    }
    if meta.format != graph::FORMAT {
      return Err(Error::Format(meta.format))
    }
    store::validate_artifact_path(&meta.data)?;
    let graph = Graph::load(dir.join(&meta.data), device)?;
    log::info!("loaded {graph} from {}", dir.display());
    Ok(graph)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use candle_core::Tensor;
  use rand::{ SeedableRng, rngs::StdRng };

  use crate::{ evaluate::Signature, model::Mlp };

  fn graph() -> Graph {
    Graph::trace(&Mlp::new(&mut StdRng::seed_from_u64(5), &Device::Cpu).unwrap())
  }

  fn signature() -> Signature {
    let x = Tensor::zeros((2, 4), candle_core::DType::F32, &Device::Cpu).unwrap();
    let y = Tensor::zeros((2, 3), candle_core::DType::F32, &Device::Cpu).unwrap();
    Signature::infer(&x, &y)
  }

  #[test]
  fn run_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let tracking = Tracking::open(dir.path()).unwrap();

    let run = tracking.start_run().unwrap();
    let run_id = run.id().to_string();
    assert_eq!(run_id.len(), 32);
    assert_eq!(tracking.get_run(&run_id).unwrap(), *run.info());
    assert_eq!(run.info().status, RunStatus::Running);

    run.log_param("epochs", 100).unwrap();
    run.log_metric("accuracy", 0.5, 0).unwrap();
    run.log_metric("accuracy", 0.75, 1).unwrap();
    let info = run.finish().unwrap();

    assert_eq!(info.status, RunStatus::Finished);
    assert!(info.end_time.is_some());
    assert_eq!(tracking.get_run(&run_id).unwrap(), info);

    let run_dir = tracking.root().join(DEFAULT_EXPERIMENT_ID).join(&run_id);
    assert_eq!(fs::read_to_string(run_dir.join("params/epochs")).unwrap(), "100");
    let history = fs::read_to_string(run_dir.join("metrics/accuracy")).unwrap();
    let steps: Vec<_> = history.lines().map(|l| l.split(' ').skip(1).collect::<Vec<_>>().join(" ") ).collect();
    assert_eq!(steps, vec!["0.5 0", "0.75 1"]);
  }

  #[test]
  fn dropped_run_fails() {
    let dir = tempfile::tempdir().unwrap();
    let tracking = Tracking::open(dir.path()).unwrap();
    let run_id = {
      let run = tracking.start_run().unwrap();
      run.id().to_string()
    };
    assert_eq!(tracking.get_run(&run_id).unwrap().status, RunStatus::Failed);
  }

  #[test]
  fn versions_count_up() {
    let dir = tempfile::tempdir().unwrap();
    let tracking = Tracking::open(dir.path()).unwrap();
    let graph = graph();

    for expected in 1..=3 {
      let run = tracking.start_run().unwrap();
      let logged = run.log_model(&graph, "model", &signature(), Some("demo-reg-model")).unwrap();
      assert_eq!(logged.version.unwrap().version, expected);
      run.finish().unwrap();
    }

    let registered = tracking.get_registered_model("demo-reg-model").unwrap();
    assert_eq!(registered.latest_version, 3);
    let latest = tracking.resolve("models:/demo-reg-model/latest").unwrap();
    let third = tracking.resolve("models:/demo-reg-model/3").unwrap();
    assert_eq!(latest, third);
    assert!(matches!(tracking.resolve("models:/demo-reg-model/4"), Err(Error::NotFound(_))));
  }

  #[test]
  fn load_by_every_uri() {
    let dir = tempfile::tempdir().unwrap();
    let tracking = Tracking::open(dir.path()).unwrap();
    let graph = graph();
    let run = tracking.start_run().unwrap();
    let logged = run.log_model(&graph, "model", &signature(), Some("demo-reg-model")).unwrap();
    assert_eq!(logged.artifact_uri, run.artifact_uri("model"));
    run.finish().unwrap();

    let x = Tensor::new(&[4.4f32, 3.0, 1.3, 0.2], &Device::Cpu).unwrap();
    let expected = graph.forward(&x).unwrap().to_vec1::<f32>().unwrap();
    let path = logged.artifact_uri.to_string_lossy().to_string();
    for uri in [logged.model_uri.as_str(), "models:/demo-reg-model/1", path.as_str()] {
      let loaded = tracking.load_model(uri, &Device::Cpu).unwrap();
      assert_eq!(loaded.forward(&x).unwrap().to_vec1::<f32>().unwrap(), expected, "{uri}");
    }

    let meta = tracking.read_model_meta(&logged.model_uri).unwrap();
    assert_eq!(meta.signature, signature());
    assert_eq!(meta.artifact_path, "model");
  }

  #[test]
  fn model_data_stays_inside_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let tracking = Tracking::open(dir.path()).unwrap();
    let run = tracking.start_run().unwrap();
    let logged = run.log_model(&graph(), "model", &signature(), None).unwrap();
    run.finish().unwrap();

    let descriptor = logged.artifact_uri.join(MODEL_META_FILE);
    let mut meta: ModelMeta = store::read_json(&descriptor).unwrap();
    meta.data = "../../../model.nn".to_string();
    store::write_json(&descriptor, &meta).unwrap();

    assert!(matches!(tracking.load_model(&logged.model_uri, &Device::Cpu), Err(Error::InvalidName(_))));
  }

  #[test]
  fn unknown_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let tracking = Tracking::open(dir.path()).unwrap();
    assert!(matches!(tracking.get_run("0123"), Err(Error::NotFound(_))));
    assert!(matches!(tracking.get_registered_model("nope"), Err(Error::NotFound(_))));
    assert!(matches!(tracking.load_model("runs:/0123/model", &Device::Cpu), Err(Error::NotFound(_))));
    assert!(matches!(tracking.register_model("a/b", dir.path(), "0123"), Err(Error::InvalidName(_))));
  }

  #[test]
  fn reopen_keeps_experiment() {
    let dir = tempfile::tempdir().unwrap();
    let first = Tracking::open(dir.path()).unwrap().ensure_experiment(DEFAULT_EXPERIMENT_ID, "Default").unwrap();
    let second = Tracking::open(dir.path()).unwrap().ensure_experiment(DEFAULT_EXPERIMENT_ID, "Default").unwrap();
    assert_eq!(first, second);
  }
}
