use candle_core::{ Device, Tensor, D };
use rand::{ SeedableRng, rngs::StdRng };

use crate::{
  config::Config,
  dataset::Dataset,
  error::{ Error, Result },
  evaluate::evaluate,
  graph::Graph,
  model::Mlp,
  registry::{ ModelVersion, RunInfo, Tracking },
  train::{ train, TrainConfig, TrainReport },
};


/// Hand-picked setosa flower used for the final prediction.
pub const SAMPLE: [f32; 4] = [4.4, 3.0, 1.3, 0.2];
pub const SAMPLE_CLASS: &str = "setosa";

pub const ARTIFACT_PATH: &str = "model";


/// Everything one pipeline run produced.

#[derive(Debug, Clone)]
pub struct Report {
  pub training: TrainReport,
  pub accuracy: f32,
  pub run: RunInfo,
  pub artifact_uri: String,
  pub version: Option<ModelVersion>,
  pub prediction: Vec<f32>,
  pub predicted_class: usize,
  pub predicted_name: &'static str,
}


/// Train, evaluate, log, reload and query the Iris classifier.

pub fn run(config: &Config, epochs: usize, device: &Device) -> Result<Report> {
  let split = Dataset::iris().train_test_split(config.test_size, config.seed)?;
  let (x_train, x_test, y_train, y_test) = split.tensors(device)?;
  log::info!("split iris into {} training and {} test rows", split.train.len(), split.test.len());

  let mut rng = StdRng::seed_from_u64(config.seed);
  let mlp = Mlp::new(&mut rng, device)?;
  let graph = Graph::trace(&mlp);
  log::info!("traced {graph}");

  let train_config = TrainConfig { learning_rate: config.learning_rate, ..TrainConfig::default() };
  let training = train(&graph, epochs, &x_train, &y_train, &train_config)?;

  let evaluation = evaluate(&graph, &x_test, &y_test)?;
  log::info!("prediction accuracy {}", evaluation.accuracy);

  let tracking = Tracking::open(&config.tracking_uri)?;
  let run = tracking.start_run()?;
  run.log_param("epochs", epochs)?;
  run.log_param("learning_rate", config.learning_rate)?;
  run.log_param("seed", config.seed)?;
  run.log_metric("accuracy", evaluation.accuracy as f64, 0)?;
  if let Some(loss) = training.final_loss() {
    run.log_metric("loss", loss as f64, epochs as u64)?;
  }

  let logged = run.log_model(&graph, ARTIFACT_PATH, &evaluation.signature, Some(config.registered_model_name.as_str()))?;
  let artifact_uri = run.artifact_uri(ARTIFACT_PATH).to_string_lossy().into_owned();
  let loaded = tracking.load_model(&artifact_uri, device)?;

  let sample = Tensor::new(&SAMPLE, device)?;
  let prediction = loaded.forward(&sample)?.detach();
  let predicted_class = prediction.argmax(D::Minus1)?.to_scalar::<u32>()? as usize;
  let predicted_name = Dataset::target_name(predicted_class)
    .ok_or_else(|| Error::InvalidGraph(format!("model predicts unknown class {predicted_class}")) )?;
  let prediction = prediction.to_vec1::<f32>()?;

  let run = run.finish()?;

  Ok(Report {
    training,
    accuracy: evaluation.accuracy,
    run,
    artifact_uri,
    version: logged.version,
    prediction,
    predicted_class,
    predicted_name,
  })
}
