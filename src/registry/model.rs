use std::path::PathBuf;

use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  evaluate::Signature,
  registry::store::{ validate_name, validate_artifact_path },
};


pub const FLAVOR: &str = "iris-registry.graph";
pub const MODEL_META_FILE: &str = "MLmodel";
pub const MODEL_DATA_FILE: &str = "data/model.nn";


/// Descriptor written next to every logged model.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
  pub run_id: String,
  pub artifact_path: String,
  pub flavor: String,
  pub format: u32,
  pub data: String,
  pub utc_time_created: u64,
  pub signature: Signature,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
  pub name: String,
  pub creation_timestamp: u64,
  pub last_updated_timestamp: u64,
  pub latest_version: u32,
}


/// One numbered entry of a registered model, pointing at a run's artifact.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
  pub name: String,
  pub version: u32,
  pub source: PathBuf,
  pub run_id: String,
  pub creation_timestamp: u64,
}


/// Result of logging a model within a run.

#[derive(Debug, Clone)]
pub struct LoggedModel {
  pub model_uri: String,
  pub artifact_uri: PathBuf,
  pub version: Option<ModelVersion>,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
  Latest,
  Number(u32),
}


/// Locations [load_model](super::Tracking::load_model) understands.
///
/// - `runs:/<run_id>/<artifact_path>`
/// - `models:/<name>/<version>` or `models:/<name>/latest`
/// - `file://<path>` or a plain filesystem path

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelUri {
  Path(PathBuf),
  Run { run_id: String, artifact_path: String },
  Registered { name: String, version: VersionSelector },
}

impl ModelUri {
  pub fn parse(uri: &str) -> Result<Self> {
    let invalid = || Error::InvalidUri(uri.to_string());

    if let Some(rest) = uri.strip_prefix("runs:/") {
      let (run_id, artifact_path) = rest.split_once('/').ok_or_else(invalid)?;
      validate_name(run_id).map_err(|_| invalid() )?;
      validate_artifact_path(artifact_path).map_err(|_| invalid() )?;
      Ok(Self::Run { run_id: run_id.to_string(), artifact_path: artifact_path.to_string() })

    } else if let Some(rest) = uri.strip_prefix("models:/") {
      let (name, version) = rest.split_once('/').ok_or_else(invalid)?;
      validate_name(name).map_err(|_| invalid() )?;
      let version = match version {
        "latest" => VersionSelector::Latest,
        number => match number.parse::<u32>() {
          Ok(n) if n > 0 => VersionSelector::Number(n),
          _ => return Err(invalid()),
        },
      };
      Ok(Self::Registered { name: name.to_string(), version })

    } else if let Some(path) = uri.strip_prefix("file://") {
      Ok(Self::Path(PathBuf::from(path)))

    } else if uri.is_empty() {
      Err(invalid())

    } else {
      Ok(Self::Path(PathBuf::from(uri)))
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_uris() {
    assert_eq!(ModelUri::parse("runs:/abc/model").unwrap(), ModelUri::Run {
      run_id: "abc".into(),
      artifact_path: "model".into(),
    });
    assert_eq!(ModelUri::parse("models:/demo-reg-model/3").unwrap(), ModelUri::Registered {
      name: "demo-reg-model".into(),
      version: VersionSelector::Number(3),
    });
    assert_eq!(ModelUri::parse("models:/demo-reg-model/latest").unwrap(), ModelUri::Registered {
      name: "demo-reg-model".into(),
      version: VersionSelector::Latest,
    });
    assert_eq!(ModelUri::parse("file:///tmp/model").unwrap(), ModelUri::Path("/tmp/model".into()));
    assert_eq!(ModelUri::parse("mlruns/0/x").unwrap(), ModelUri::Path("mlruns/0/x".into()));
  }

  #[test]
  fn reject_malformed_uris() {
    for bad in ["", "runs:/abc", "runs:/../model", "models:/demo", "models:/demo/0", "models:/demo/first", "models:/../1"] {
      assert!(matches!(ModelUri::parse(bad), Err(Error::InvalidUri(_))), "{bad:?}");
    }
  }
}
