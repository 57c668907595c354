use candle_core::{ DType, Tensor, D };
use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  graph::Graph,
};


/// Type and shape of one model input or output. A shape entry of `-1`
/// stands for the variable batch dimension.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorSpec {
  pub dtype: String,
  pub shape: Vec<i64>,
}

impl TensorSpec {
  pub fn of(tensor: &Tensor) -> Self {
    let shape = tensor.dims()
      .iter()
      .enumerate()
      .map(|(i, &d)| if i == 0 && tensor.rank() > 1 { -1 } else { d as i64 } )
      .collect();
    Self { dtype: dtype_name(tensor.dtype()).to_string(), shape }
  }
}

fn dtype_name(dtype: DType) -> &'static str {
  match dtype {
    DType::U8 => "uint8",
    DType::U32 => "uint32",
    DType::I64 => "int64",
    DType::F16 => "float16",
    DType::F32 => "float32",
    DType::F64 => "float64",
    other => other.as_str(),
  }
}


/// Input and output schema stored next to a logged model.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
  pub inputs: Vec<TensorSpec>,
  pub outputs: Vec<TensorSpec>,
}

impl Signature {
  /// Infer the schema from one example input and the output it produced.
  pub fn infer(input: &Tensor, output: &Tensor) -> Self {
    Self {
      inputs: vec![TensorSpec::of(input)],
      outputs: vec![TensorSpec::of(output)],
    }
  }
}


/// Fraction of predictions equal to their label.

pub fn accuracy(predictions: &[u32], labels: &[u32]) -> Result<f32> {
  if predictions.len() != labels.len() {
    return Err(Error::Score(format!("{} predictions for {} labels", predictions.len(), labels.len())))
  }
  if labels.is_empty() {
    return Err(Error::Score("no predictions".to_string()))
  }
  let hits = predictions.iter().zip(labels).filter(|(p, l)| p == l ).count();
  Ok(hits as f32 / labels.len() as f32)
}


#[derive(Debug, Clone)]
pub struct Evaluation {
  pub accuracy: f32,
  pub signature: Signature,
}

/// Score `graph` on a held-out batch.

pub fn evaluate(graph: &Graph, x: &Tensor, y: &Tensor) -> Result<Evaluation> {
  let logits = graph.forward(x)?.detach();
  let predictions = logits.argmax(D::Minus1)?.to_vec1::<u32>()?;
  let labels = y.to_dtype(DType::U32)?.to_vec1::<u32>()?;
  Ok(Evaluation {
    accuracy: accuracy(&predictions, &labels)?,
    signature: Signature::infer(x, &logits),
  })
}
