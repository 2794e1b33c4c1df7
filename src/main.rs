//! cardio-train - Main Entry Point
//!
//! Model selection and training pipeline for heart-disease classification.

use clap::Parser;
use cardio_train::cli::{cmd_inspect, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardio_train=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            train,
            test,
            artifact,
            threshold,
            seed,
        } => {
            cmd_train(&train, &test, &artifact, threshold, seed)?;
        }
        Commands::Inspect { artifact } => {
            cmd_inspect(&artifact)?;
        }
        Commands::Predict { artifact, input } => {
            cmd_predict(&artifact, &input)?;
        }
    }

    Ok(())
}
