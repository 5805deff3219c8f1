//! Model training: the boosted-tree classifier, cross-validation utilities,
//! the hyperparameter grid search, and evaluation metrics.

pub mod cross_validation;
pub mod gbt;
pub mod grid_search;
pub mod metrics;

pub use cross_validation::{train_test_split, CvScores, FoldSplit, KFold};
pub use gbt::{GbtClassifier, GbtConfig, ImportanceType, Node, Tree};
pub use grid_search::{CandidateResult, GridSearchCv, ParamGrid, SearchOutcome};
pub use metrics::ConfusionMatrix;
