//! Command-line interface for the heart-disease analysis pipeline.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::dataset;
use crate::features;
use crate::training::{
    train_test_split, ConfusionMatrix, GbtClassifier, GbtConfig, GridSearchCv, ParamGrid,
};
use crate::viz;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cardio-boost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Boosted-tree heart-disease classifier with grid-search tuning")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full pipeline: clean, tune, evaluate, and draw the first tree
    Run {
        /// Headerless CSV of the Cleveland dataset
        #[arg(short, long)]
        data: PathBuf,

        /// Number of cross-validation folds
        #[arg(long, default_value = "5")]
        folds: usize,

        /// Random seed for the train/test split and the booster
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value = "0.25")]
        test_size: f64,

        /// Write the first tuned tree as Graphviz DOT
        #[arg(long)]
        dot: Option<PathBuf>,

        /// Save the tuned model as JSON
        #[arg(long)]
        model_out: Option<PathBuf>,
    },

    /// Train and evaluate with default hyperparameters only
    Train {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(long, default_value = "0.25")]
        test_size: f64,
    },

    /// Cross-validated grid search without the final evaluation
    Tune {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long, default_value = "5")]
        folds: usize,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(long, default_value = "0.25")]
        test_size: f64,
    },

    /// Summarize the raw dataset
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Shared pipeline steps ─────────────────────────────────────────────────────

struct PreparedData {
    x_train: ndarray::Array2<f64>,
    x_test: ndarray::Array2<f64>,
    y_train: ndarray::Array1<f64>,
    y_test: ndarray::Array1<f64>,
    feature_names: Vec<String>,
}

fn prepare(data_path: &Path, test_size: f64, seed: u64) -> anyhow::Result<PreparedData> {
    step_run("Loading data");
    let start = Instant::now();
    let raw = dataset::load(data_path)?;
    let flagged = dataset::sentinel_rows(&raw)?;
    step_done(&format!(
        "{} rows, {} with missing values, in {:?}",
        raw.height(),
        flagged,
        start.elapsed()
    ));

    step_run("Resolving missing values");
    let clean = dataset::resolve_missing(&raw)?;
    step_done(&format!("{} rows kept", clean.height()));

    step_run("Formatting features");
    let (matrix, y) = features::format_features(&clean)?;
    step_done(&format!("{} one-hot features", matrix.n_features()));

    let (x_train, x_test, y_train, y_test) =
        train_test_split(&matrix.x, &y, test_size, seed)?;

    Ok(PreparedData {
        x_train,
        x_test,
        y_train,
        y_test,
        feature_names: matrix.names,
    })
}

fn evaluate(model: &GbtClassifier, data: &PreparedData) -> anyhow::Result<ConfusionMatrix> {
    let preds = model.predict(&data.x_test)?;
    let matrix = ConfusionMatrix::from_predictions(
        data.y_test.as_slice().unwrap_or(&[]),
        preds.as_slice().unwrap_or(&[]),
    );
    Ok(matrix)
}

fn print_evaluation(matrix: &ConfusionMatrix) {
    println!();
    println!("{}", matrix);
    let (absent, present) = matrix.class_rates();
    println!();
    println!(
        "  {:<16} {}",
        muted("Accuracy"),
        format!("{:.4}", matrix.accuracy()).white().bold()
    );
    println!("  {:<16} {:.1}%", muted("Absent found"), absent * 100.0);
    println!("  {:<16} {:.1}%", muted("Present found"), present * 100.0);
}

fn print_best_params(config: &GbtConfig, score: f64) {
    println!();
    println!("  {:<16} {}", muted("CV accuracy"), format!("{:.4}", score).white().bold());
    println!("  {:<16} {}", muted("max_depth"), config.max_depth);
    println!("  {:<16} {}", muted("n_estimators"), config.n_estimators);
    println!("  {:<16} {}", muted("learning_rate"), config.learning_rate);
    println!("  {:<16} {}", muted("gamma"), config.gamma);
    println!("  {:<16} {}", muted("reg_lambda"), config.reg_lambda);
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(
    data_path: &PathBuf,
    folds: usize,
    seed: u64,
    test_size: f64,
    dot: Option<&Path>,
    model_out: Option<&Path>,
) -> anyhow::Result<()> {
    section("Run");

    let data = prepare(data_path, test_size, seed)?;
    let base = GbtConfig {
        random_state: Some(seed),
        ..Default::default()
    };

    step_run("Fitting preliminary model");
    let start = Instant::now();
    let mut preliminary = GbtClassifier::new(base.clone());
    preliminary.fit(&data.x_train, &data.y_train)?;
    step_done(&format!("{:?}", start.elapsed()));

    let preliminary_eval = evaluate(&preliminary, &data)?;

    step_run("Grid search");
    let start = Instant::now();
    let outcome = GridSearchCv::new(ParamGrid::default())
        .with_folds(folds)
        .with_base_config(base)
        .run(&data.x_train, &data.y_train)?;
    step_done(&format!(
        "{} candidates in {:?}",
        outcome.results.len(),
        start.elapsed()
    ));

    step_run("Fitting tuned model");
    let start = Instant::now();
    let mut tuned = GbtClassifier::new(outcome.best_config.clone());
    tuned.fit(&data.x_train, &data.y_train)?;
    step_done(&format!("{:?}", start.elapsed()));

    section("Best parameters");
    print_best_params(&outcome.best_config, outcome.best_score);

    section("Preliminary model");
    print_evaluation(&preliminary_eval);

    section("Tuned model");
    let tuned_eval = evaluate(&tuned, &data)?;
    print_evaluation(&tuned_eval);

    section("Feature importance");
    let rows = viz::importance_table(&tuned, &data.feature_names)?;
    println!();
    println!(
        "  {:<16} {:>8} {:>10} {:>10}",
        muted("Feature"),
        muted("Weight"),
        muted("Gain"),
        muted("Cover")
    );
    println!("  {}", dim(&"─".repeat(48)));
    for row in rows.iter().take(10) {
        println!(
            "  {:<16} {:>8.0} {:>10.4} {:>10.1}",
            row.feature, row.weight, row.gain, row.cover
        );
    }

    if let Some(dot_path) = dot {
        // A failed diagram never sinks a finished analysis.
        if let Err(err) = viz::write_dot(&tuned, 0, &data.feature_names, dot_path) {
            tracing::warn!(%err, "tree diagram skipped");
        } else {
            println!();
            println!("  {} tree written to {}", ok("✓"), dot_path.display());
        }
    }

    if let Some(model_path) = model_out {
        tuned.save(&model_path.to_string_lossy())?;
        println!("  {} model saved to {}", ok("✓"), model_path.display());
    }

    println!();
    Ok(())
}

pub fn cmd_train(data_path: &PathBuf, seed: u64, test_size: f64) -> anyhow::Result<()> {
    section("Train");

    let data = prepare(data_path, test_size, seed)?;

    step_run("Fitting model");
    let start = Instant::now();
    let mut model = GbtClassifier::new(GbtConfig {
        random_state: Some(seed),
        ..Default::default()
    });
    model.fit(&data.x_train, &data.y_train)?;
    step_done(&format!("{:?}", start.elapsed()));

    let eval = evaluate(&model, &data)?;
    print_evaluation(&eval);
    println!();
    Ok(())
}

pub fn cmd_tune(data_path: &PathBuf, folds: usize, seed: u64, test_size: f64) -> anyhow::Result<()> {
    section("Tune");

    let data = prepare(data_path, test_size, seed)?;

    step_run("Grid search");
    let start = Instant::now();
    let outcome = GridSearchCv::new(ParamGrid::default())
        .with_folds(folds)
        .with_base_config(GbtConfig {
            random_state: Some(seed),
            ..Default::default()
        })
        .run(&data.x_train, &data.y_train)?;
    step_done(&format!(
        "{} candidates in {:?}",
        outcome.results.len(),
        start.elapsed()
    ));

    section("Best parameters");
    print_best_params(&outcome.best_config, outcome.best_score);
    println!();
    Ok(())
}

pub fn cmd_info(data_path: &PathBuf) -> anyhow::Result<()> {
    section("Data Info");

    let df = dataset::load(data_path)?;
    let flagged = dataset::sentinel_rows(&df)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {}", muted("Missing"), flagged);
    println!();

    println!("  {:<12} {:<14} {:>6}", muted("Column"), muted("Kind"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(36)));
    for (name, kind) in dataset::schema() {
        let nulls = df.column(name).map(|c| c.null_count()).unwrap_or(0);
        println!(
            "  {:<12} {:<14} {:>6}",
            name,
            format!("{:?}", kind).truecolor(140, 140, 140),
            nulls
        );
    }

    println!();
    Ok(())
}
