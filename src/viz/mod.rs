//! Graphviz export of fitted trees and importance reporting
//!
//! Renders one tree of the ensemble as DOT text. Actually producing an image
//! is left to the `dot` binary; this module only writes the source.

use crate::error::{CardioError, Result};
use crate::training::gbt::{GbtClassifier, ImportanceType, Node, Tree};
use std::fmt::Write as _;
use std::path::Path;

const SPLIT_FILL: &str = "#78bceb";
const LEAF_FILL: &str = "#e48038";

/// Render a tree as Graphviz DOT. Split nodes are labeled
/// `name < threshold` with the gain and cover underneath; the edge carrying
/// rows with a missing value is marked.
pub fn tree_to_dot(tree: &Tree, feature_names: &[String]) -> Result<String> {
    let mut dot = String::new();
    writeln!(dot, "digraph tree {{").map_err(|e| CardioError::RenderError(e.to_string()))?;
    writeln!(dot, "    graph [rankdir=TB];").map_err(|e| CardioError::RenderError(e.to_string()))?;
    writeln!(dot, "    node [fontname=\"Helvetica\"];")
        .map_err(|e| CardioError::RenderError(e.to_string()))?;

    for (idx, node) in tree.nodes().iter().enumerate() {
        match node {
            Node::Leaf { score, cover } => {
                writeln!(
                    dot,
                    "    n{} [shape=box, style=filled, fillcolor=\"{}\", \
                     label=\"leaf = {:.4}\\ncover = {:.1}\"];",
                    idx, LEAF_FILL, score, cover
                )
                .map_err(|e| CardioError::RenderError(e.to_string()))?;
            }
            Node::Split {
                feature,
                threshold,
                default_left,
                gain,
                cover,
                left,
                right,
            } => {
                let name = feature_names.get(*feature).map(String::as_str).ok_or_else(|| {
                    CardioError::RenderError(format!(
                        "split references feature {} but only {} names given",
                        feature,
                        feature_names.len()
                    ))
                })?;
                writeln!(
                    dot,
                    "    n{} [shape=box, style=\"filled, rounded\", fillcolor=\"{}\", \
                     label=\"{} < {:.4}\\ngain = {:.4}, cover = {:.1}\"];",
                    idx, SPLIT_FILL, name, threshold, gain, cover
                )
                .map_err(|e| CardioError::RenderError(e.to_string()))?;

                let yes_label = if *default_left { "yes, missing" } else { "yes" };
                let no_label = if *default_left { "no" } else { "no, missing" };
                writeln!(dot, "    n{} -> n{} [label=\"{}\"];", idx, left, yes_label)
                    .map_err(|e| CardioError::RenderError(e.to_string()))?;
                writeln!(dot, "    n{} -> n{} [label=\"{}\"];", idx, right, no_label)
                    .map_err(|e| CardioError::RenderError(e.to_string()))?;
            }
        }
    }

    writeln!(dot, "}}").map_err(|e| CardioError::RenderError(e.to_string()))?;
    Ok(dot)
}

/// Render a tree of a fitted model and write the DOT source to a file.
pub fn write_dot(
    model: &GbtClassifier,
    tree_index: usize,
    feature_names: &[String],
    path: impl AsRef<Path>,
) -> Result<()> {
    let tree = model.tree(tree_index).ok_or_else(|| {
        CardioError::RenderError(format!(
            "tree index {} out of range ({} trees)",
            tree_index,
            model.n_estimators()
        ))
    })?;
    let dot = tree_to_dot(tree, feature_names)?;
    std::fs::write(path.as_ref(), dot)?;
    tracing::info!(tree = tree_index, path = %path.as_ref().display(), "wrote tree diagram");
    Ok(())
}

/// One row of the importance report.
#[derive(Debug, Clone)]
pub struct ImportanceRow {
    pub feature: String,
    pub weight: f64,
    pub gain: f64,
    pub cover: f64,
    pub total_gain: f64,
    pub total_cover: f64,
}

/// Collect all importance statistics per feature, sorted by total gain
/// descending. Features never used in a split are dropped.
pub fn importance_table(
    model: &GbtClassifier,
    feature_names: &[String],
) -> Result<Vec<ImportanceRow>> {
    let weight = model.importance(ImportanceType::Weight)?;
    let gain = model.importance(ImportanceType::Gain)?;
    let cover = model.importance(ImportanceType::Cover)?;
    let total_gain = model.importance(ImportanceType::TotalGain)?;
    let total_cover = model.importance(ImportanceType::TotalCover)?;

    if feature_names.len() != weight.len() {
        return Err(CardioError::ShapeError {
            expected: format!("{} feature names", weight.len()),
            actual: format!("{}", feature_names.len()),
        });
    }

    let mut rows: Vec<ImportanceRow> = feature_names
        .iter()
        .enumerate()
        .filter(|(i, _)| weight[*i] > 0.0)
        .map(|(i, name)| ImportanceRow {
            feature: name.clone(),
            weight: weight[i],
            gain: gain[i],
            cover: cover[i],
            total_gain: total_gain[i],
            total_cover: total_cover[i],
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_gain
            .partial_cmp(&a.total_gain)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(rows)
}
