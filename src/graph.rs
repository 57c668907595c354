use std::fmt;
use std::fs;
use std::path::Path;

use candle_core::{ DType, Device, Tensor, Var };
use candle_nn::Module;
use itertools::Itertools;
use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  model::{ Dense, Mlp },
};


/// Version tag written at the front of every serialized graph.
pub const FORMAT: u32 = 1;


/// Single step of a traced forward pass.

#[derive(Debug, Clone)]
pub enum Op {
  Dense(Dense),
  Relu,
}


/// Snapshot of a network's forward pass as a flat list of operations.
///
/// A traced graph shares parameter storage with the model it was traced from,
/// so it can be trained in place of the model. It can also be saved to disc and
/// loaded elsewhere without access to the code that defined the model.

#[derive(Debug, Clone)]
pub struct Graph {
  ops: Vec<Op>,
}

impl Graph {
  pub fn new(ops: Vec<Op>) -> Result<Self> {
    let mut width = None;
    for op in &ops {
      if let Op::Dense(layer) = op {
        if layer.weight.rank() != 2 {
          return Err(Error::InvalidGraph(format!("weight of rank {}", layer.weight.rank())))
        }
        if layer.bias.dims() != [layer.size()].as_slice() {
          return Err(Error::InvalidGraph(format!("bias of shape {:?} for {} outputs", layer.bias.dims(), layer.size())))
        }
        match width {
          Some(width) if width != layer.input_size() => return Err(Error::InvalidGraph(
            format!("layer expects {} inputs but receives {width}", layer.input_size())
          )),
          _ => {},
        }
        width = Some(layer.size());
      }
    }
    if width.is_none() {
      return Err(Error::InvalidGraph("no dense layers".to_string()))
    }
    Ok(Self { ops })
  }

  /// Record the forward pass of `mlp`.
  pub fn trace(mlp: &Mlp) -> Self {
    let [fc1, fc2, fc3] = mlp.layers();
    let ops = vec![
      Op::Dense(fc1.clone()),
      Op::Relu,
      Op::Dense(fc2.clone()),
      Op::Relu,
      Op::Dense(fc3.clone()),
    ];
    Self { ops }
  }

  pub fn ops(&self) -> &[Op] {
    &self.ops
  }

  fn dense_layers(&self) -> impl Iterator<Item = &Dense> {
    self.ops.iter().filter_map(|op| match op {
      Op::Dense(layer) => Some(layer),
      Op::Relu => None,
    })
  }

  pub fn input_size(&self) -> usize {
    self.dense_layers().next().map(Dense::input_size).unwrap_or(0)
  }

  pub fn output_size(&self) -> usize {
    self.dense_layers().last().map(Dense::size).unwrap_or(0)
  }

  /// Trainable parameters in op order.
  pub fn vars(&self) -> Vec<Var> {
    self.dense_layers()
      .flat_map(|layer| [layer.weight.clone(), layer.bias.clone()] )
      .collect()
  }

  /// Logits for a single sample `[in]` or a batch `[n, in]`.
  /// The output has the same rank as the input.
  pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
    let expected = self.input_size();
    let batched = match input.dims() {
      [n] if *n == expected => input.unsqueeze(0)?,
      [_, n] if *n == expected => input.clone(),
      dims => return Err(Error::Shape { expected, got: dims.to_vec() }),
    };

    let mut x = batched.to_dtype(DType::F32)?;
    for op in &self.ops {
      x = match op {
        Op::Dense(layer) => layer.forward(&x)?,
        Op::Relu => x.relu()?,
      };
    }

    if input.rank() == 1 {
      Ok(x.squeeze(0)?)
    } else {
      Ok(x)
    }
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    let ops = self.ops.iter().map(|op| -> Result<OpDump> {
      Ok(match op {
        Op::Dense(layer) => OpDump::Dense {
          weight: TensorDump::from_tensor(layer.weight.as_tensor())?,
          bias: TensorDump::from_tensor(layer.bias.as_tensor())?,
        },
        Op::Relu => OpDump::Relu,
      })
    }).collect::<Result<Vec<_>>>()?;

    Ok(postcard::to_allocvec(&GraphDump { format: FORMAT, ops })?)
  }

  pub fn from_bytes(bytes: &[u8], device: &Device) -> Result<Self> {
    let dump: GraphDump = postcard::from_bytes(bytes)?;
    if dump.format != FORMAT {
      return Err(Error::Format(dump.format))
    }
    let ops = dump.ops.into_iter().map(|op| -> Result<Op> {
      Ok(match op {
        OpDump::Dense { weight, bias } => Op::Dense(Dense::from_vars(
          Var::from_tensor(&weight.complete(device)?)?,
          Var::from_tensor(&bias.complete(device)?)?,
        )),
        OpDump::Relu => Op::Relu,
      })
    }).collect::<Result<Vec<_>>>()?;
    Self::new(ops)
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, self.to_bytes()?).map_err(Error::io(path))
  }

  pub fn load(path: impl AsRef<Path>, device: &Device) -> Result<Self> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(Error::io(path))?;
    Self::from_bytes(&bytes, device)
  }
}

impl fmt::Display for Graph {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let ops = self.ops.iter().map(|op| match op {
      Op::Dense(layer) => format!("Dense({} -> {})", layer.input_size(), layer.size()),
      Op::Relu => "Relu".to_string(),
    }).join(" | ");
    write!(f, "Graph[{ops}]")
  }
}


#[derive(Serialize, Deserialize)]
struct TensorDump {
  dims: Vec<usize>,
  data: Vec<f32>,
}

impl TensorDump {
  fn from_tensor(tensor: &Tensor) -> Result<Self> {
    Ok(Self {
      dims: tensor.dims().to_vec(),
      data: tensor.flatten_all()?.to_dtype(DType::F32)?.to_vec1()?,
    })
  }

  fn complete(self, device: &Device) -> Result<Tensor> {
    Ok(Tensor::from_vec(self.data, self.dims, device)?)
  }
}

#[derive(Serialize, Deserialize)]
enum OpDump {
  Dense { weight: TensorDump, bias: TensorDump },
  Relu,
}

#[derive(Serialize, Deserialize)]
struct GraphDump {
  format: u32,
  ops: Vec<OpDump>,
}
