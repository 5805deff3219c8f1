//! K-fold splitting and the shuffled train/test split

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// One train/validation partition of a k-fold scheme.
#[derive(Debug, Clone)]
pub struct FoldSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter. Contiguous, unshuffled folds by default, matching the
/// partition-rotate-average scheme the grid search uses; seeded shuffling is
/// opt-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.random_state = Some(seed);
        self
    }

    /// Partition `0..n_samples` into disjoint folds covering every index
    /// exactly once.
    pub fn split(&self, n_samples: usize) -> Result<Vec<FoldSplit>> {
        if self.n_splits < 2 {
            return Err(CardioError::InvalidParameter {
                name: "n_splits".to_string(),
                value: format!("{}", self.n_splits),
                reason: "must be at least 2".to_string(),
            });
        }
        if n_samples < self.n_splits {
            return Err(CardioError::InvalidParameter {
                name: "n_samples".to_string(),
                value: format!("{}", n_samples),
                reason: format!("must be >= n_splits ({})", self.n_splits),
            });
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let fold_sizes: Vec<usize> = (0..self.n_splits)
            .map(|i| {
                let base = n_samples / self.n_splits;
                let remainder = n_samples % self.n_splits;
                if i < remainder {
                    base + 1
                } else {
                    base
                }
            })
            .collect();

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;

        for (fold_idx, &fold_size) in fold_sizes.iter().enumerate() {
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(FoldSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }
}

/// Select rows of a matrix by index, in the given order.
pub fn select_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((indices.len(), x.ncols()), |(r, c)| x[[indices[r], c]])
}

/// Select elements of a vector by index, in the given order.
pub fn select(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    indices.iter().map(|&i| y[i]).collect()
}

/// Shuffled train/test split. Rows keep their pairing with targets; the
/// shuffle happens at the split, not before it.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>)> {
    if x.nrows() != y.len() {
        return Err(CardioError::ShapeError {
            expected: format!("{} targets", x.nrows()),
            actual: format!("{}", y.len()),
        });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(CardioError::InvalidParameter {
            name: "test_size".to_string(),
            value: format!("{}", test_size),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let n = x.nrows();
    let n_test = ((n as f64) * test_size).round() as usize;
    let n_test = n_test.clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok((
        select_rows(x, train_idx),
        select_rows(x, test_idx),
        select(y, train_idx),
        select(y, test_idx),
    ))
}

/// Aggregated cross-validation scores for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvScores {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

impl CvScores {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            scores,
            mean,
            std: variance.sqrt(),
        }
    }

    /// Worst-possible result, assigned to candidates whose fit failed.
    pub fn failed() -> Self {
        Self {
            scores: Vec::new(),
            mean: f64::NEG_INFINITY,
            std: 0.0,
        }
    }
}
