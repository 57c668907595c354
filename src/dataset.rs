use candle_core::{ Device, Tensor };
use itertools::Itertools;
use rand::{ SeedableRng, rngs::StdRng, seq::SliceRandom };

use crate::error::{ Error, Result };


pub const NUM_FEATURES: usize = 4;
pub const NUM_CLASSES: usize = 3;
pub const TARGET_NAMES: [&str; NUM_CLASSES] = ["setosa", "versicolor", "virginica"];


/// Tabular samples with one integer class label per row.

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
  pub features: Vec<[f32; NUM_FEATURES]>,
  pub labels: Vec<u32>,
}

/// A dataset divided once into disjoint training and test halves.

#[derive(Debug, Clone)]
pub struct Split {
  pub train: Dataset,
  pub test: Dataset,
}

impl Dataset {
  /// The 150 row Iris dataset, 50 rows per class in label order.
  pub fn iris() -> Self {
    Self {
      features: IRIS.to_vec(),
      labels: (0..IRIS.len()).map(|i| (i / 50) as u32 ).collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn target_name(label: usize) -> Option<&'static str> {
    TARGET_NAMES.get(label).copied()
  }

  fn subset(&self, rows: &[usize]) -> Self {
    Self {
      features: rows.iter().map(|&i| self.features[i] ).collect(),
      labels: rows.iter().map(|&i| self.labels[i] ).collect(),
    }
  }

  /// Stratified shuffle split.
  ///
  /// Every class contributes `round(test_size * class_len)` rows to the test half.
  /// Both halves are shuffled afterwards so classes interleave. The same seed
  /// always yields the same split.
  pub fn train_test_split(&self, test_size: f32, seed: u64) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
      return Err(Error::Split(format!("test size {test_size} must lie strictly between 0 and 1")))
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(self.len());
    let mut test = Vec::with_capacity(self.len());

    let classes = (0..self.len()).into_group_map_by(|&i| self.labels[i] );
    for (label, mut rows) in classes.into_iter().sorted_by_key(|(label, _)| *label ) {
      rows.shuffle(&mut rng);
      let num_test = (test_size * rows.len() as f32).round() as usize;
      if num_test == 0 || num_test == rows.len() {
        return Err(Error::Split(format!(
          "class {label} with {} rows cannot be split at test size {test_size}", rows.len()
        )))
      }
      test.extend_from_slice(&rows[..num_test]);
      train.extend_from_slice(&rows[num_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(Split {
      train: self.subset(&train),
      test: self.subset(&test),
    })
  }

  /// Feature matrix `f32 [n, 4]` and label vector `u32 [n]`.
  pub fn tensors(&self, device: &Device) -> Result<(Tensor, Tensor)> {
    let flat: Vec<f32> = self.features.iter().flatten().copied().collect();
    let x = Tensor::from_vec(flat, (self.len(), NUM_FEATURES), device)?;
    let y = Tensor::from_vec(self.labels.clone(), self.len(), device)?;
    Ok((x, y))
  }
}

impl Split {
  /// `(x_train, x_test, y_train, y_test)`
  pub fn tensors(&self, device: &Device) -> Result<(Tensor, Tensor, Tensor, Tensor)> {
    let (x_train, y_train) = self.train.tensors(device)?;
    let (x_test, y_test) = self.test.tensors(device)?;
    Ok((x_train, x_test, y_train, y_test))
  }
}


// sepal length, sepal width, petal length, petal width (cm)
const IRIS: [[f32; NUM_FEATURES]; 150] = [
  [5.1, 3.5, 1.4, 0.2], [4.9, 3.0, 1.4, 0.2], [4.7, 3.2, 1.3, 0.2], [4.6, 3.1, 1.5, 0.2],
  [5.0, 3.6, 1.4, 0.2], [5.4, 3.9, 1.7, 0.4], [4.6, 3.4, 1.4, 0.3], [5.0, 3.4, 1.5, 0.2],
  [4.4, 2.9, 1.4, 0.2], [4.9, 3.1, 1.5, 0.1], [5.4, 3.7, 1.5, 0.2], [4.8, 3.4, 1.6, 0.2],
  [4.8, 3.0, 1.4, 0.1], [4.3, 3.0, 1.1, 0.1], [5.8, 4.0, 1.2, 0.2], [5.7, 4.4, 1.5, 0.4],
  [5.4, 3.9, 1.3, 0.4], [5.1, 3.5, 1.4, 0.3], [5.7, 3.8, 1.7, 0.3], [5.1, 3.8, 1.5, 0.3],
  [5.4, 3.4, 1.7, 0.2], [5.1, 3.7, 1.5, 0.4], [4.6, 3.6, 1.0, 0.2], [5.1, 3.3, 1.7, 0.5],
  [4.8, 3.4, 1.9, 0.2], [5.0, 3.0, 1.6, 0.2], [5.0, 3.4, 1.6, 0.4], [5.2, 3.5, 1.5, 0.2],
  [5.2, 3.4, 1.4, 0.2], [4.7, 3.2, 1.6, 0.2], [4.8, 3.1, 1.6, 0.2], [5.4, 3.4, 1.5, 0.4],
  [5.2, 4.1, 1.5, 0.1], [5.5, 4.2, 1.4, 0.2], [4.9, 3.1, 1.5, 0.2], [5.0, 3.2, 1.2, 0.2],
  [5.5, 3.5, 1.3, 0.2], [4.9, 3.6, 1.4, 0.1], [4.4, 3.0, 1.3, 0.2], [5.1, 3.4, 1.5, 0.2],
  [5.0, 3.5, 1.3, 0.3], [4.5, 2.3, 1.3, 0.3], [4.4, 3.2, 1.3, 0.2], [5.0, 3.5, 1.6, 0.6],
  [5.1, 3.8, 1.9, 0.4], [4.8, 3.0, 1.4, 0.3], [5.1, 3.8, 1.6, 0.2], [4.6, 3.2, 1.4, 0.2],
  [5.3, 3.7, 1.5, 0.2], [5.0, 3.3, 1.4, 0.2],

  [7.0, 3.2, 4.7, 1.4], [6.4, 3.2, 4.5, 1.5], [6.9, 3.1, 4.9, 1.5], [5.5, 2.3, 4.0, 1.3],
  [6.5, 2.8, 4.6, 1.5], [5.7, 2.8, 4.5, 1.3], [6.3, 3.3, 4.7, 1.6], [4.9, 2.4, 3.3, 1.0],
  [6.6, 2.9, 4.6, 1.3], [5.2, 2.7, 3.9, 1.4], [5.0, 2.0, 3.5, 1.0], [5.9, 3.0, 4.2, 1.5],
  [6.0, 2.2, 4.0, 1.0], [6.1, 2.9, 4.7, 1.4], [5.6, 2.9, 3.6, 1.3], [6.7, 3.1, 4.4, 1.4],
  [5.6, 3.0, 4.5, 1.5], [5.8, 2.7, 4.1, 1.0], [6.2, 2.2, 4.5, 1.5], [5.6, 2.5, 3.9, 1.1],
  [5.9, 3.2, 4.8, 1.8], [6.1, 2.8, 4.0, 1.3], [6.3, 2.5, 4.9, 1.5], [6.1, 2.8, 4.7, 1.2],
  [6.4, 2.9, 4.3, 1.3], [6.6, 3.0, 4.4, 1.4], [6.8, 2.8, 4.8, 1.4], [6.7, 3.0, 5.0, 1.7],
  [6.0, 2.9, 4.5, 1.5], [5.7, 2.6, 3.5, 1.0], [5.5, 2.4, 3.8, 1.1], [5.5, 2.4, 3.7, 1.0],
  [5.8, 2.7, 3.9, 1.2], [6.0, 2.7, 5.1, 1.6], [5.4, 3.0, 4.5, 1.5], [6.0, 3.4, 4.5, 1.6],
  [6.7, 3.1, 4.7, 1.5], [6.3, 2.3, 4.4, 1.3], [5.6, 3.0, 4.1, 1.3], [5.5, 2.5, 4.0, 1.3],
  [5.5, 2.6, 4.4, 1.2], [6.1, 3.0, 4.6, 1.4], [5.8, 2.6, 4.0, 1.2], [5.0, 2.3, 3.3, 1.0],
  [5.6, 2.7, 4.2, 1.3], [5.7, 3.0, 4.2, 1.2], [5.7, 2.9, 4.2, 1.3], [6.2, 2.9, 4.3, 1.3],
  [5.1, 2.5, 3.0, 1.1], [5.7, 2.8, 4.1, 1.3],

  [6.3, 3.3, 6.0, 2.5], [5.8, 2.7, 5.1, 1.9], [7.1, 3.0, 5.9, 2.1], [6.3, 2.9, 5.6, 1.8],
  [6.5, 3.0, 5.8, 2.2], [7.6, 3.0, 6.6, 2.1], [4.9, 2.5, 4.5, 1.7], [7.3, 2.9, 6.3, 1.8],
  [6.7, 2.5, 5.8, 1.8], [7.2, 3.6, 6.1, 2.5], [6.5, 3.2, 5.1, 2.0], [6.4, 2.7, 5.3, 1.9],
  [6.8, 3.0, 5.5, 2.1], [5.7, 2.5, 5.0, 2.0], [5.8, 2.8, 5.1, 2.4], [6.4, 3.2, 5.3, 2.3],
  [6.5, 3.0, 5.5, 1.8], [7.7, 3.8, 6.7, 2.2], [7.7, 2.6, 6.9, 2.3], [6.0, 2.2, 5.0, 1.5],
  [6.9, 3.2, 5.7, 2.3], [5.6, 2.8, 4.9, 2.0], [7.7, 2.8, 6.7, 2.0], [6.3, 2.7, 4.9, 1.8],
  [6.7, 3.3, 5.7, 2.1], [7.2, 3.2, 6.0, 1.8], [6.2, 2.8, 4.8, 1.8], [6.1, 3.0, 4.9, 1.8],
  [6.4, 2.8, 5.6, 2.1], [7.2, 3.0, 5.8, 1.6], [7.4, 2.8, 6.1, 1.9], [7.9, 3.8, 6.4, 2.0],
  [6.4, 2.8, 5.6, 2.2], [6.3, 2.8, 5.1, 1.5], [6.1, 2.6, 5.6, 1.4], [7.7, 3.0, 6.1, 2.3],
  [6.3, 3.4, 5.6, 2.4], [6.4, 3.1, 5.5, 1.8], [6.0, 3.0, 4.8, 1.8], [6.9, 3.1, 5.4, 2.1],
  [6.7, 3.1, 5.6, 2.4], [6.9, 3.1, 5.1, 2.3], [5.8, 2.7, 5.1, 1.9], [6.8, 3.2, 5.9, 2.3],
  [6.7, 3.3, 5.7, 2.5], [6.7, 3.0, 5.2, 2.3], [6.3, 2.5, 5.0, 1.9], [6.5, 3.0, 5.2, 2.0],
  [6.2, 3.4, 5.4, 2.3], [5.9, 3.0, 5.1, 1.8],
];


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn iris_shape() {
    let iris = Dataset::iris();
    assert_eq!(iris.len(), 150);
    for label in 0..NUM_CLASSES as u32 {
      assert_eq!(iris.labels.iter().filter(|&&l| l == label ).count(), 50);
    }
  }

  #[test]
  fn stratified_split() {
    let split = Dataset::iris().train_test_split(0.2, 42).unwrap();
    assert_eq!(split.train.len(), 120);
    assert_eq!(split.test.len(), 30);
    for label in 0..NUM_CLASSES as u32 {
      assert_eq!(split.test.labels.iter().filter(|&&l| l == label ).count(), 10);
    }
  }

  #[test]
  fn split_is_seeded() {
    let iris = Dataset::iris();
    let a = iris.train_test_split(0.2, 7).unwrap();
    let b = iris.train_test_split(0.2, 7).unwrap();
    let c = iris.train_test_split(0.2, 8).unwrap();
    assert_eq!(a.test, b.test);
    assert_ne!(a.test, c.test);
  }

  #[test]
  fn rejects_degenerate_test_size() {
    let iris = Dataset::iris();
    assert!(matches!(iris.train_test_split(0.0, 1), Err(Error::Split(_))));
    assert!(matches!(iris.train_test_split(1.0, 1), Err(Error::Split(_))));
    assert!(matches!(iris.train_test_split(0.001, 1), Err(Error::Split(_))));
  }

  #[test]
  fn tensor_shapes() {
    let split = Dataset::iris().train_test_split(0.2, 42).unwrap();
    let (x_train, x_test, y_train, y_test) = split.tensors(&Device::Cpu).unwrap();
    assert_eq!(x_train.dims(), &[120, 4]);
    assert_eq!(x_test.dims(), &[30, 4]);
    assert_eq!(y_train.dims(), &[120]);
    assert_eq!(y_test.dims(), &[30]);
  }
}
