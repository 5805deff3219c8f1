//! Gradient-boosted trees with second-order approximation
//!
//! Logistic objective for binary classification:
//! - gradient g = p - y, hessian h = p * (1 - p)
//! - regularized leaf weight w* = -G / (H + lambda)
//! - split score: 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)], accepted only
//!   when it exceeds gamma
//! - missing values (NaN) follow a per-split default direction, learned from
//!   whichever side scores higher when missing mass is present
//!
//! The rest of the pipeline treats this module as a black box behind
//! `fit` / `predict` / `predict_proba` / `importance` / `tree`.

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Booster configuration. The five tuned knobs come first; the rest stay at
/// library defaults unless a caller overrides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbtConfig {
    pub max_depth: usize,
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Minimum split score (pruning threshold)
    pub gamma: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for GbtConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            n_estimators: 100,
            learning_rate: 0.3,
            gamma: 0.0,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

impl GbtConfig {
    /// Reject configurations that cannot produce a model. Degenerate grid
    /// candidates fail here and get scored as failing by the sweep.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(CardioError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "ensemble needs at least one tree".to_string(),
            });
        }
        if self.max_depth == 0 {
            return Err(CardioError::InvalidParameter {
                name: "max_depth".to_string(),
                value: "0".to_string(),
                reason: "trees need at least one level".to_string(),
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(CardioError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: format!("{}", self.learning_rate),
                reason: "must be positive".to_string(),
            });
        }
        if self.gamma < 0.0 || self.reg_lambda < 0.0 {
            return Err(CardioError::InvalidParameter {
                name: "gamma/reg_lambda".to_string(),
                value: format!("{}/{}", self.gamma, self.reg_lambda),
                reason: "must be non-negative".to_string(),
            });
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0)
            || !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0)
        {
            return Err(CardioError::InvalidParameter {
                name: "subsample/colsample_bytree".to_string(),
                value: format!("{}/{}", self.subsample, self.colsample_bytree),
                reason: "must be in (0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

/// Which importance statistic to extract from a fitted ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportanceType {
    /// Number of times a feature is used in a split
    Weight,
    /// Average split score where the feature is used
    Gain,
    /// Average hessian mass covered by splits on the feature
    Cover,
    TotalGain,
    TotalCover,
}

/// Node in a flattened tree. Children are arena indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        score: f64,
        cover: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        /// Where rows with a missing feature value go
        default_left: bool,
        gain: f64,
        cover: f64,
        left: usize,
        right: usize,
    },
}

/// A single tree of the ensemble, stored as a node arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
    root: usize,
}

impl Tree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Raw score contribution of this tree for one sample.
    pub fn score_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = self.root;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { score, .. } => return *score,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                    ..
                } => {
                    let v = row[*feature];
                    idx = if v.is_nan() {
                        if *default_left {
                            *left
                        } else {
                            *right
                        }
                    } else if v < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    default_left: bool,
    cover: f64,
}

fn split_score(g: f64, h: f64, lambda: f64) -> f64 {
    (g * g) / (h + lambda)
}

/// Exact greedy split search over one feature, trying missing mass on both
/// sides when the node contains NaNs for that feature.
fn find_best_split(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &GbtConfig,
) -> Option<SplitCandidate> {
    let mut finite: Vec<usize> = Vec::with_capacity(indices.len());
    let mut g_miss = 0.0;
    let mut h_miss = 0.0;
    for &i in indices {
        if x[[i, feature]].is_nan() {
            g_miss += grad[i];
            h_miss += hess[i];
        } else {
            finite.push(i);
        }
    }
    if finite.len() < 2 {
        return None;
    }

    finite.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let g_total: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = indices.iter().map(|&i| hess[i]).sum();
    let parent_score = split_score(g_total, h_total, config.reg_lambda);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for pos in 0..finite.len() - 1 {
        let idx = finite[pos];
        g_left += grad[idx];
        h_left += hess[idx];

        // Identical adjacent values cannot be separated.
        let here = x[[idx, feature]];
        let next = x[[finite[pos + 1], feature]];
        if (here - next).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_miss - g_left;
        let h_right = h_total - h_miss - h_left;

        // Score both assignments of the missing mass.
        let mut gain = f64::NEG_INFINITY;
        let mut default_left = true;
        for miss_left in [true, false] {
            let (gl, hl, gr, hr) = if miss_left {
                (g_left + g_miss, h_left + h_miss, g_right, h_right)
            } else {
                (g_left, h_left, g_right + g_miss, h_right + h_miss)
            };
            if hl < config.min_child_weight || hr < config.min_child_weight {
                continue;
            }
            let candidate = 0.5
                * (split_score(gl, hl, config.reg_lambda)
                    + split_score(gr, hr, config.reg_lambda)
                    - parent_score);
            if candidate > gain {
                gain = candidate;
                default_left = miss_left;
            }
        }

        if gain > best.as_ref().map_or(f64::NEG_INFINITY, |b| b.gain) {
            best = Some(SplitCandidate {
                feature,
                threshold: (here + next) / 2.0,
                gain,
                default_left,
                cover: h_total,
            });
        }
    }

    best
}

/// Recursively grow a tree into the arena; returns the index of the node
/// created for `indices`.
fn grow(
    nodes: &mut Vec<Node>,
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &GbtConfig,
) -> usize {
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let leaf_score = -g_sum / (h_sum + config.reg_lambda);

    let make_leaf = |nodes: &mut Vec<Node>| {
        nodes.push(Node::Leaf {
            score: leaf_score,
            cover: h_sum,
        });
        nodes.len() - 1
    };

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return make_leaf(nodes);
    }

    // Total order on (gain, feature) keeps the reduction deterministic
    // regardless of rayon scheduling.
    let best = feature_indices
        .par_iter()
        .filter_map(|&f| find_best_split(x, grad, hess, indices, f, config))
        .max_by(|a, b| {
            a.gain
                .partial_cmp(&b.gain)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.feature.cmp(&a.feature))
        });

    let split = match best {
        Some(s) if s.gain > config.gamma => s,
        _ => return make_leaf(nodes),
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices.iter().partition(|&&i| {
        let v = x[[i, split.feature]];
        if v.is_nan() {
            split.default_left
        } else {
            v < split.threshold
        }
    });

    if left_idx.is_empty() || right_idx.is_empty() {
        return make_leaf(nodes);
    }

    let left = grow(nodes, x, grad, hess, &left_idx, feature_indices, depth + 1, config);
    let right = grow(nodes, x, grad, hess, &right_idx, feature_indices, depth + 1, config);

    nodes.push(Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        default_left: split.default_left,
        gain: split.gain,
        cover: split.cover,
        left,
        right,
    });
    nodes.len() - 1
}

fn build_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    config: &GbtConfig,
) -> Tree {
    let mut nodes = Vec::new();
    let root = grow(&mut nodes, x, grad, hess, indices, feature_indices, 0, config);
    Tree { nodes, root }
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

/// Boosted-tree binary classifier (logistic objective).
///
/// Each instance owns its trees exclusively; fitting twice with the same
/// seed reproduces the same ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbtClassifier {
    config: GbtConfig,
    trees: Vec<Tree>,
    base_score: f64,
    n_features: usize,
}

impl GbtClassifier {
    pub fn new(config: GbtConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &GbtConfig {
        &self.config
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(CardioError::TrainingError("empty training set".to_string()));
        }
        if n_samples != y.len() {
            return Err(CardioError::ShapeError {
                expected: format!("{} targets", n_samples),
                actual: format!("{}", y.len()),
            });
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(CardioError::TrainingError(
                "target must be binary (0/1)".to_string(),
            ));
        }

        let n_features = x.ncols();
        self.n_features = n_features;

        // Base score in log-odds space.
        let p = y.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        let mut raw_preds = Array1::from_elem(n_samples, self.base_score);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for _ in 0..self.config.n_estimators {
            let probs: Array1<f64> = raw_preds.mapv(Self::sigmoid);
            let grad: Array1<f64> = &probs - y;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-7));

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let tree = build_tree(x, &grad, &hess, &row_indices, &col_indices, &self.config);

            for &i in &row_indices {
                raw_preds[i] += self.config.learning_rate * tree.score_row(x.row(i));
            }

            self.trees.push(tree);
        }

        Ok(())
    }

    /// Probability of the positive class for each row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(CardioError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(CardioError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{}", x.ncols()),
            });
        }

        let mut raw = Array1::from_elem(x.nrows(), self.base_score);
        for i in 0..x.nrows() {
            let row = x.row(i);
            for tree in &self.trees {
                raw[i] += self.config.learning_rate * tree.score_row(row);
            }
        }
        Ok(raw.mapv(Self::sigmoid))
    }

    /// Hard 0/1 labels at the 0.5 threshold.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Classification accuracy on a labeled set.
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let preds = self.predict(x)?;
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count();
        Ok(correct as f64 / y.len() as f64)
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Access one tree of the ensemble, for structure export.
    pub fn tree(&self, index: usize) -> Option<&Tree> {
        self.trees.get(index)
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Per-feature importance of the requested kind. Indexed by feature
    /// column; callers pair the values with their feature names.
    pub fn importance(&self, kind: ImportanceType) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(CardioError::ModelNotFitted);
        }

        let mut weight = vec![0.0f64; self.n_features];
        let mut total_gain = vec![0.0f64; self.n_features];
        let mut total_cover = vec![0.0f64; self.n_features];

        for tree in &self.trees {
            for node in tree.nodes() {
                if let Node::Split {
                    feature,
                    gain,
                    cover,
                    ..
                } = node
                {
                    weight[*feature] += 1.0;
                    total_gain[*feature] += gain;
                    total_cover[*feature] += cover;
                }
            }
        }

        let averaged = |totals: &[f64]| {
            totals
                .iter()
                .zip(weight.iter())
                .map(|(t, w)| if *w > 0.0 { t / w } else { 0.0 })
                .collect()
        };

        Ok(match kind {
            ImportanceType::Weight => weight,
            ImportanceType::Gain => averaged(&total_gain),
            ImportanceType::Cover => averaged(&total_cover),
            ImportanceType::TotalGain => total_gain,
            ImportanceType::TotalCover => total_cover,
        })
    }

    /// Serialize the fitted model to a JSON file. Caller-invoked only; the
    /// pipeline itself writes nothing.
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&json)?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((60, 2), (0..120).map(|i| (i % 23) as f64 * 0.37).collect())
            .unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] + r[1] > 8.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_fit_and_score() {
        let (x, y) = classification_data();
        let mut model = GbtClassifier::new(GbtConfig {
            n_estimators: 40,
            max_depth: 4,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let acc = model.score(&x, &y).unwrap();
        assert!(acc >= 0.9, "training accuracy = {}", acc);
    }

    #[test]
    fn test_predict_proba_in_unit_interval() {
        let (x, y) = classification_data();
        let mut model = GbtClassifier::new(Default::default());
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), x.nrows());
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let (x, y) = classification_data();
        let config = GbtConfig {
            n_estimators: 25,
            max_depth: 3,
            subsample: 0.8,
            colsample_bytree: 0.8,
            random_state: Some(42),
            ..Default::default()
        };

        let mut a = GbtClassifier::new(config.clone());
        a.fit(&x, &y).unwrap();
        let mut b = GbtClassifier::new(config);
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_missing_values_follow_default_direction() {
        let (mut x, y) = classification_data();
        x[[3, 0]] = f64::NAN;
        x[[17, 1]] = f64::NAN;
        let mut model = GbtClassifier::new(GbtConfig {
            n_estimators: 20,
            max_depth: 3,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds.len(), x.nrows());
        assert!(preds.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let (x, y) = classification_data();
        let mut model = GbtClassifier::new(GbtConfig {
            n_estimators: 0,
            ..Default::default()
        });
        let err = model.fit(&x, &y).unwrap_err();
        assert!(matches!(err, CardioError::InvalidParameter { .. }));
    }

    #[test]
    fn test_non_binary_target_is_rejected() {
        let (x, _) = classification_data();
        let y = Array1::from_elem(x.nrows(), 2.0);
        let mut model = GbtClassifier::new(Default::default());
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let (x, _) = classification_data();
        let model = GbtClassifier::new(Default::default());
        assert!(matches!(
            model.predict(&x).unwrap_err(),
            CardioError::ModelNotFitted
        ));
    }

    #[test]
    fn test_importance_sums_match_split_counts() {
        let (x, y) = classification_data();
        let mut model = GbtClassifier::new(GbtConfig {
            n_estimators: 15,
            max_depth: 3,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let weight = model.importance(ImportanceType::Weight).unwrap();
        let total_gain = model.importance(ImportanceType::TotalGain).unwrap();
        assert_eq!(weight.len(), 2);
        assert!(weight.iter().sum::<f64>() > 0.0);
        // A feature with no splits contributes no gain.
        for (w, g) in weight.iter().zip(total_gain.iter()) {
            if *w == 0.0 {
                assert_eq!(*g, 0.0);
            }
        }
    }
}
