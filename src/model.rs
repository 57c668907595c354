use candle_core::{ Device, Tensor, Var };
use candle_nn::{ Linear, Module };
use rand::Rng;

use crate::{
  error::Result,
  dataset::{ NUM_FEATURES, NUM_CLASSES },
};


pub const HIDDEN_SIZE: usize = 30;


/// Fully connected layer whose weights live in trainable [Var]s.

#[derive(Debug, Clone)]
pub struct Dense {
  pub weight: Var,
  pub bias: Var,
  linear: Linear,
}

impl Dense {
  /// Weight `[size, input_size]` and bias `[size]`, both drawn uniformly
  /// from `±1/sqrt(input_size)`.
  pub fn new(rng: &mut impl Rng, input_size: usize, size: usize, device: &Device) -> Result<Self> {
    let bound = 1.0 / (input_size as f32).sqrt();
    let mut uniform = |len: usize| (0..len)
      .map(|_| rng.gen_range(-bound, bound) )
      .collect::<Vec<f32>>();

    let weight = Tensor::from_vec(uniform(size * input_size), (size, input_size), device)?;
    let bias = Tensor::from_vec(uniform(size), size, device)?;
    Ok(Self::from_vars(Var::from_tensor(&weight)?, Var::from_tensor(&bias)?))
  }

  pub fn from_vars(weight: Var, bias: Var) -> Self {
    // Linear keeps handles to the same storage the optimizer updates
    let linear = Linear::new(weight.as_tensor().clone(), Some(bias.as_tensor().clone()));
    Self { weight, bias, linear }
  }

  pub fn input_size(&self) -> usize {
    self.weight.dims()[1]
  }

  pub fn size(&self) -> usize {
    self.weight.dims()[0]
  }
}

impl Module for Dense {
  fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
    self.linear.forward(input)
  }
}


/// Three layer perceptron with a fixed 4 → 30 → 30 → 3 topology.

#[derive(Debug, Clone)]
pub struct Mlp {
  pub fc1: Dense,
  pub fc2: Dense,
  pub fc3: Dense,
}

impl Mlp {
  pub fn new(rng: &mut impl Rng, device: &Device) -> Result<Self> {
    Ok(Self {
      fc1: Dense::new(rng, NUM_FEATURES, HIDDEN_SIZE, device)?,
      fc2: Dense::new(rng, HIDDEN_SIZE, HIDDEN_SIZE, device)?,
      fc3: Dense::new(rng, HIDDEN_SIZE, NUM_CLASSES, device)?,
    })
  }

  pub fn layers(&self) -> [&Dense; 3] {
    [&self.fc1, &self.fc2, &self.fc3]
  }

  pub fn vars(&self) -> Vec<Var> {
    self.layers()
      .iter()
      .flat_map(|layer| [layer.weight.clone(), layer.bias.clone()] )
      .collect()
  }
}

impl Module for Mlp {
  fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
    let x = self.fc1.forward(input)?.relu()?;
    let x = self.fc2.forward(&x)?.relu()?;
    self.fc3.forward(&x)
  }
}
