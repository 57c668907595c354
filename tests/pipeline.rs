use candle_core::{ Device, Tensor };

use iris_registry::{
  config::Config,
  pipeline::{ self, SAMPLE, SAMPLE_CLASS },
  registry::{ RunStatus, Tracking },
};


#[test]
fn trains_registers_and_predicts() {
  let dir = tempfile::tempdir().unwrap();
  let config = Config::default().with_tracking_uri(dir.path());

  let report = pipeline::run(&config, 100, &Device::Cpu).unwrap();

  assert!(report.accuracy >= 0.7, "accuracy {}", report.accuracy);
  assert!(report.training.final_loss().unwrap() < report.training.first_loss().unwrap());
  assert_eq!(report.prediction.len(), 3);
  assert_eq!(report.predicted_name, SAMPLE_CLASS);
  assert_eq!(report.run.status, RunStatus::Finished);
  assert_eq!(report.version.as_ref().unwrap().version, 1);
  assert_eq!(report.version.as_ref().unwrap().name, "demo-reg-model");

  // A consumer only needs the registered name
  let tracking = Tracking::open(dir.path()).unwrap();
  let graph = tracking.load_model("models:/demo-reg-model/latest", &Device::Cpu).unwrap();
  let sample = Tensor::new(&SAMPLE, &Device::Cpu).unwrap();
  let prediction = graph.forward(&sample).unwrap().to_vec1::<f32>().unwrap();
  assert_eq!(prediction, report.prediction);
}

#[test]
fn reruns_add_versions() {
  let dir = tempfile::tempdir().unwrap();
  let config = Config::default().with_tracking_uri(dir.path());

  let first = pipeline::run(&config, 5, &Device::Cpu).unwrap();
  let second = pipeline::run(&config, 5, &Device::Cpu).unwrap();

  assert_ne!(first.run.run_id, second.run.run_id);
  assert_eq!(second.version.unwrap().version, 2);

  let tracking = Tracking::open(dir.path()).unwrap();
  assert_eq!(tracking.get_registered_model("demo-reg-model").unwrap().latest_version, 2);
}

#[test]
fn zero_epochs_still_log() {
  let dir = tempfile::tempdir().unwrap();
  let config = Config::default().with_tracking_uri(dir.path());
  let report = pipeline::run(&config, 0, &Device::Cpu).unwrap();
  assert!(report.training.losses.is_empty());
  assert!(report.predicted_class < 3);
}
