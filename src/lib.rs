//! Cardio Boost - boosted-tree heart-disease classification
//!
//! A complete analysis pipeline for the Cleveland heart-disease dataset:
//! - [`dataset`] - CSV loading, schema naming, missing-value resolution
//! - [`features`] - target split, one-hot encoding, target binarization
//! - [`training`] - the gradient-boosted classifier, k-fold cross-validation,
//!   grid search, and the confusion matrix
//! - [`viz`] - Graphviz tree export and feature-importance reporting
//! - [`cli`] - command-line interface

pub mod cli;
pub mod dataset;
pub mod error;
pub mod features;
pub mod training;
pub mod viz;

/// Common imports for downstream use.
pub mod prelude {
    pub use crate::dataset::{load, resolve_missing, sentinel_rows};
    pub use crate::error::{CardioError, Result};
    pub use crate::features::{format_features, FeatureMatrix};
    pub use crate::training::{
        train_test_split, ConfusionMatrix, GbtClassifier, GbtConfig, GridSearchCv, ImportanceType,
        KFold, ParamGrid,
    };
    pub use crate::viz::{importance_table, tree_to_dot, write_dot};
}
