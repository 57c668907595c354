//! Train, trace and register a small Iris classifier.
//!
//! A fixed 4 → 30 → 30 → 3 perceptron is traced into a [Graph], trained with
//! cross-entropy and Adam, scored on a held-out split and logged into a local
//! model [registry]. The logged graph is then loaded back and queried, without
//! any of the model code.
//!
//! ```no_run
//! use iris_registry::{ config::{ Config, select_device }, pipeline };
//!
//! let device = select_device().unwrap();
//! let report = pipeline::run(&Config::from_env(), 100, &device).unwrap();
//! println!("{} -> {}", report.accuracy, report.predicted_name);
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod train;

pub use dataset::Dataset;
pub use error::{ Error, Result };
pub use graph::Graph;
pub use model::Mlp;
pub use registry::Tracking;
