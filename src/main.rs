//! Cardio Boost - Main Entry Point

use cardio_boost::cli::{cmd_info, cmd_run, cmd_train, cmd_tune, Cli, Commands};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardio_boost=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            folds,
            seed,
            test_size,
            dot,
            model_out,
        } => {
            cmd_run(&data, folds, seed, test_size, dot.as_deref(), model_out.as_deref())?;
        }
        Commands::Train {
            data,
            seed,
            test_size,
        } => {
            cmd_train(&data, seed, test_size)?;
        }
        Commands::Tune {
            data,
            folds,
            seed,
            test_size,
        } => {
            cmd_tune(&data, folds, seed, test_size)?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
