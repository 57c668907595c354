use candle_core::Tensor;
use candle_nn::{ AdamW, Optimizer, ParamsAdamW, loss };

use crate::{
  error::Result,
  graph::Graph,
};


/// Settings for [train].

#[derive(Debug, Clone)]
pub struct TrainConfig {
  pub learning_rate: f64,
  pub log_every: usize,
}

impl Default for TrainConfig {
  fn default() -> Self {
    Self { learning_rate: 0.01, log_every: 10 }
  }
}

impl TrainConfig {
  /// Plain Adam. candle's AdamW without weight decay.
  fn adam(&self) -> ParamsAdamW {
    ParamsAdamW {
      lr: self.learning_rate,
      beta1: 0.9,
      beta2: 0.999,
      eps: 1e-8,
      weight_decay: 0.0,
    }
  }
}


#[derive(Debug, Clone, Default)]
pub struct TrainReport {
  /// Loss of every epoch, measured before that epoch's update.
  pub losses: Vec<f32>,
}

impl TrainReport {
  pub fn first_loss(&self) -> Option<f32> {
    self.losses.first().copied()
  }

  pub fn final_loss(&self) -> Option<f32> {
    self.losses.last().copied()
  }
}


/// Full-batch training of a traced graph with cross-entropy loss and Adam.
///
/// Updates the graph's parameters in place, which also updates the model the
/// graph was traced from.

pub fn train(graph: &Graph, epochs: usize, x: &Tensor, y: &Tensor, config: &TrainConfig) -> Result<TrainReport> {
  let mut optimizer = AdamW::new(graph.vars(), config.adam())?;
  let mut report = TrainReport { losses: Vec::with_capacity(epochs) };

  for epoch in 0..epochs {
    let logits = graph.forward(x)?;
    let loss = loss::cross_entropy(&logits, y)?;
    optimizer.backward_step(&loss)?;

    let loss = loss.to_scalar::<f32>()?;
    if config.log_every > 0 && epoch % config.log_every == 0 {
      log::info!("number of epoch {epoch} loss {loss}");
    }
    report.losses.push(loss);
  }

  Ok(report)
}


#[cfg(test)]
mod tests {
  use super::*;
  use candle_core::Device;
  use rand::{ SeedableRng, rngs::StdRng };

  use crate::{ dataset::Dataset, model::Mlp };

  fn setup() -> (Graph, Tensor, Tensor) {
    let mlp = Mlp::new(&mut StdRng::seed_from_u64(42), &Device::Cpu).unwrap();
    let (x, y) = Dataset::iris().tensors(&Device::Cpu).unwrap();
    (Graph::trace(&mlp), x, y)
  }

  #[test]
  fn loss_decreases() {
    let (graph, x, y) = setup();
    let report = train(&graph, 50, &x, &y, &TrainConfig::default()).unwrap();
    assert_eq!(report.losses.len(), 50);
    assert!(report.final_loss().unwrap() < report.first_loss().unwrap());
  }

  #[test]
  fn zero_epochs_leave_weights_alone() {
    let (graph, x, y) = setup();
    let before = graph.vars()[0].flatten_all().unwrap().to_vec1::<f32>().unwrap();
    let report = train(&graph, 0, &x, &y, &TrainConfig::default()).unwrap();
    let after = graph.vars()[0].flatten_all().unwrap().to_vec1::<f32>().unwrap();
    assert!(report.losses.is_empty());
    assert_eq!(before, after);
  }
}
