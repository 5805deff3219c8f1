//! Exhaustive hyperparameter search with k-fold cross-validation
//!
//! Every (candidate, fold) evaluation is independent, so candidates are
//! dispatched across the rayon pool. Results are keyed by grid index and
//! reduced sequentially, so the winner is the same regardless of completion
//! order: strictly-greater mean score replaces the incumbent, which breaks
//! ties in favor of the first-enumerated candidate.

use crate::error::{CardioError, Result};
use crate::training::cross_validation::{select, select_rows, CvScores, KFold};
use crate::training::gbt::{GbtClassifier, GbtConfig};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Candidate values for the five tuned hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamGrid {
    pub max_depth: Vec<usize>,
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub gamma: Vec<f64>,
    pub reg_lambda: Vec<f64>,
}

impl Default for ParamGrid {
    /// The sweep used for the heart-disease analysis.
    fn default() -> Self {
        Self {
            max_depth: vec![3, 4, 5, 6, 7, 8],
            n_estimators: vec![50, 100, 150, 200],
            learning_rate: vec![0.1, 0.01, 0.05],
            gamma: vec![0.0, 0.25, 0.5, 1.0],
            reg_lambda: vec![0.0, 1.0, 10.0, 100.0],
        }
    }
}

impl ParamGrid {
    /// Number of candidate configurations in the Cartesian product.
    pub fn len(&self) -> usize {
        self.max_depth.len()
            * self.n_estimators.len()
            * self.learning_rate.len()
            * self.gamma.len()
            * self.reg_lambda.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerate the full grid. The nesting order below defines candidate
    /// order, and with it the tie-break order of the search.
    pub fn candidates(&self, base: &GbtConfig) -> Vec<GbtConfig> {
        let mut out = Vec::with_capacity(self.len());
        for &max_depth in &self.max_depth {
            for &n_estimators in &self.n_estimators {
                for &learning_rate in &self.learning_rate {
                    for &gamma in &self.gamma {
                        for &reg_lambda in &self.reg_lambda {
                            out.push(GbtConfig {
                                max_depth,
                                n_estimators,
                                learning_rate,
                                gamma,
                                reg_lambda,
                                ..base.clone()
                            });
                        }
                    }
                }
            }
        }
        out
    }
}

/// Cross-validated result for one grid candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub index: usize,
    pub config: GbtConfig,
    pub cv: CvScores,
    pub failed: bool,
}

/// Outcome of a full sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best_index: usize,
    pub best_config: GbtConfig,
    pub best_score: f64,
    pub results: Vec<CandidateResult>,
}

/// Grid search over [`ParamGrid`] scored by mean k-fold accuracy.
#[derive(Debug, Clone)]
pub struct GridSearchCv {
    grid: ParamGrid,
    n_folds: usize,
    base: GbtConfig,
}

impl GridSearchCv {
    pub fn new(grid: ParamGrid) -> Self {
        Self {
            grid,
            n_folds: 5,
            base: GbtConfig::default(),
        }
    }

    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    /// Base configuration the grid overrides; carries the seed and the
    /// untuned knobs.
    pub fn with_base_config(mut self, base: GbtConfig) -> Self {
        self.base = base;
        self
    }

    /// Run the sweep. A candidate whose fit fails on any fold scores as
    /// worst-possible rather than aborting the search.
    pub fn run(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchOutcome> {
        if self.grid.is_empty() {
            return Err(CardioError::SearchError("empty parameter grid".to_string()));
        }

        let folds = KFold::new(self.n_folds).split(x.nrows())?;
        let candidates = self.grid.candidates(&self.base);
        tracing::info!(
            candidates = candidates.len(),
            folds = self.n_folds,
            fits = candidates.len() * self.n_folds,
            "starting grid search"
        );

        let results: Vec<CandidateResult> = candidates
            .into_par_iter()
            .enumerate()
            .map(|(index, config)| {
                let mut scores = Vec::with_capacity(folds.len());
                for fold in &folds {
                    let x_train = select_rows(x, &fold.train_indices);
                    let y_train = select(y, &fold.train_indices);
                    let x_val = select_rows(x, &fold.test_indices);
                    let y_val = select(y, &fold.test_indices);

                    let mut model = GbtClassifier::new(config.clone());
                    let fitted = model
                        .fit(&x_train, &y_train)
                        .and_then(|_| model.score(&x_val, &y_val));
                    match fitted {
                        Ok(score) => scores.push(score),
                        Err(err) => {
                            tracing::debug!(index, %err, "candidate failed, scoring as worst");
                            return CandidateResult {
                                index,
                                config,
                                cv: CvScores::failed(),
                                failed: true,
                            };
                        }
                    }
                }
                let cv = CvScores::from_scores(scores);
                tracing::debug!(index, mean = cv.mean, std = cv.std, "candidate scored");
                CandidateResult {
                    index,
                    config,
                    cv,
                    failed: false,
                }
            })
            .collect();

        // Sequential reduction in grid order: first-encountered tie-break.
        let mut best: Option<&CandidateResult> = None;
        for result in &results {
            let is_better = match best {
                None => true,
                Some(b) => result.cv.mean > b.cv.mean,
            };
            if is_better {
                best = Some(result);
            }
        }
        let best = best.ok_or_else(|| CardioError::SearchError("no candidates".to_string()))?;
        if best.failed {
            return Err(CardioError::SearchError(
                "every grid candidate failed to fit".to_string(),
            ));
        }

        tracing::info!(
            index = best.index,
            mean = best.cv.mean,
            max_depth = best.config.max_depth,
            n_estimators = best.config.n_estimators,
            learning_rate = best.config.learning_rate,
            gamma = best.config.gamma,
            reg_lambda = best.config.reg_lambda,
            "grid search finished"
        );

        Ok(SearchOutcome {
            best_index: best.index,
            best_config: best.config.clone(),
            best_score: best.cv.mean,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(r, c)| (r as f64) + (c as f64) * 0.5);
        let y: Array1<f64> = (0..40).map(|i| if i >= 20 { 1.0 } else { 0.0 }).collect();
        (x, y)
    }

    fn tiny_grid() -> ParamGrid {
        ParamGrid {
            max_depth: vec![2, 3],
            n_estimators: vec![10],
            learning_rate: vec![0.3],
            gamma: vec![0.0],
            reg_lambda: vec![1.0],
        }
    }

    #[test]
    fn test_grid_enumeration_size_and_order() {
        let grid = ParamGrid::default();
        assert_eq!(grid.len(), 6 * 4 * 3 * 4 * 4);

        let candidates = grid.candidates(&GbtConfig::default());
        assert_eq!(candidates.len(), grid.len());
        // Innermost dimension varies first.
        assert_eq!(candidates[0].reg_lambda, 0.0);
        assert_eq!(candidates[1].reg_lambda, 1.0);
        assert_eq!(candidates[0].max_depth, 3);
        assert_eq!(candidates[candidates.len() - 1].max_depth, 8);
    }

    #[test]
    fn test_search_selects_undominated_candidate() {
        let (x, y) = separable_data();
        let outcome = GridSearchCv::new(tiny_grid())
            .with_folds(4)
            .run(&x, &y)
            .unwrap();

        for result in &outcome.results {
            assert!(
                outcome.best_score >= result.cv.mean,
                "candidate {} dominates the selection",
                result.index
            );
        }
    }

    #[test]
    fn test_search_tie_breaks_to_first_candidate() {
        let (x, y) = separable_data();
        // Both depths classify this trivially; scores tie at 1.0.
        let outcome = GridSearchCv::new(tiny_grid())
            .with_folds(4)
            .run(&x, &y)
            .unwrap();
        if outcome
            .results
            .iter()
            .all(|r| (r.cv.mean - outcome.best_score).abs() < 1e-12)
        {
            assert_eq!(outcome.best_index, 0);
        }
    }

    #[test]
    fn test_failed_candidate_scores_worst_without_aborting() {
        let (x, y) = separable_data();
        let grid = ParamGrid {
            // 0 estimators is degenerate and must not sink the sweep.
            n_estimators: vec![0, 10],
            ..tiny_grid()
        };
        let outcome = GridSearchCv::new(grid).with_folds(4).run(&x, &y).unwrap();

        let failed: Vec<&CandidateResult> =
            outcome.results.iter().filter(|r| r.failed).collect();
        assert_eq!(failed.len(), 2);
        for result in failed {
            assert_eq!(result.cv.mean, f64::NEG_INFINITY);
            assert_ne!(result.index, outcome.best_index);
        }
        assert!(outcome.best_score > 0.0);
    }

    #[test]
    fn test_all_failed_is_search_error() {
        let (x, y) = separable_data();
        let grid = ParamGrid {
            n_estimators: vec![0],
            ..tiny_grid()
        };
        let err = GridSearchCv::new(grid).with_folds(4).run(&x, &y).unwrap_err();
        assert!(matches!(err, CardioError::SearchError(_)));
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        let (x, y) = separable_data();
        let grid = ParamGrid {
            max_depth: vec![],
            ..tiny_grid()
        };
        assert!(GridSearchCv::new(grid).run(&x, &y).is_err());
    }
}
