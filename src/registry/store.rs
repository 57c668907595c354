use std::fs;
use std::path::Path;
use std::time::{ SystemTime, UNIX_EPOCH };

use serde::{ Serialize, de::DeserializeOwned };

use crate::error::{ Error, Result };


pub fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64 )
    .unwrap_or_default()
}

pub fn create_dir(path: &Path) -> Result<()> {
  fs::create_dir_all(path).map_err(Error::io(path))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let text = fs::read_to_string(path).map_err(Error::io(path))?;
  serde_json::from_str(&text).map_err(Error::metadata(path))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
  let text = serde_json::to_string_pretty(value).map_err(Error::metadata(path))?;
  fs::write(path, text).map_err(Error::io(path))
}

/// Names become directory names, so they must be a single plain path component.
pub fn validate_name(name: &str) -> Result<()> {
  let bad = name.is_empty()
    || name == "."
    || name == ".."
    || name.chars().any(|c| matches!(c, '/' | '\\' | '\0') );
  if bad {
    return Err(Error::InvalidName(name.to_string()))
  }
  Ok(())
}

/// Relative artifact paths may nest, but must stay inside the artifact root.
pub fn validate_artifact_path(path: &str) -> Result<()> {
  if path.is_empty() || path.starts_with('/') {
    return Err(Error::InvalidName(path.to_string()))
  }
  path.split('/').try_for_each(validate_name)
    .map_err(|_| Error::InvalidName(path.to_string()) )
}
