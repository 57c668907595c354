use std::io;
use std::path::{ Path, PathBuf };

use thiserror::Error;


/// Everything that can go wrong between loading the data and reading a model back.

#[derive(Debug, Error)]
pub enum Error {
  #[error("tensor operation failed: {0}")]
  Tensor(#[from] candle_core::Error),

  #[error("i/o error on {}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("model encoding failed: {0}")]
  Encoding(#[from] postcard::Error),

  #[error("malformed metadata in {}", .path.display())]
  Metadata {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid dataset split: {0}")]
  Split(String),

  #[error("unsupported graph format {0}")]
  Format(u32),

  #[error("malformed graph: {0}")]
  InvalidGraph(String),

  #[error("expected input of shape [{expected}] or [n, {expected}], got {got:?}")]
  Shape {
    expected: usize,
    got: Vec<usize>,
  },

  #[error("cannot score predictions: {0}")]
  Score(String),

  #[error("invalid name {0:?}")]
  InvalidName(String),

  #[error("invalid model uri {0:?}")]
  InvalidUri(String),

  #[error("{0} not found")]
  NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
  pub fn io(path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> Self {
    let path = path.as_ref().to_path_buf();
    move |source| Self::Io { path, source }
  }

  pub fn metadata(path: impl AsRef<Path>) -> impl FnOnce(serde_json::Error) -> Self {
    let path = path.as_ref().to_path_buf();
    move |source| Self::Metadata { path, source }
  }
}
