//! alpha-backtest CLI
//!
//! # Usage
//!
//! ```bash
//! # Resample and merge raw series into a weekly table
//! alpha-backtest preprocess --config config/preprocessing_config.json
//!
//! # Build the forward excess-return target and features
//! alpha-backtest features --config config/features_config.json
//!
//! # Walk-forward evaluation, final fit and metrics
//! alpha-backtest train --config config/train_config.json --parallel
//!
//! # Join predictions with preprocessing columns for plotting
//! alpha-backtest dashboard --config config/dashboard_config.json
//!
//! # Empty stage folders
//! alpha-backtest clean --model --dashboard
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use alpha_backtest::data::StageStore;
use alpha_backtest::stages::{
    clean_stages, load_config, run_dashboard, run_features, run_preprocess, run_train,
    DashboardConfig, FeaturesConfig, PreprocessConfig, TrainConfig, DEFAULT_STAGES,
};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "alpha-backtest")]
#[command(about = "Walk-forward evaluation of forward excess-return models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root directory holding one folder per stage
    #[arg(long, default_value = "data", global = true)]
    data: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample raw CSVs to weekly and merge them
    Preprocess {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/preprocessing_config.json")]
        config: PathBuf,
    },

    /// Build target and feature columns
    Features {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/features_config.json")]
        config: PathBuf,
    },

    /// Run walk-forward evaluation and fit the final model
    Train {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/train_config.json")]
        config: PathBuf,

        /// Fit windows in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Join model predictions with preprocessing columns
    Dashboard {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/dashboard_config.json")]
        config: PathBuf,
    },

    /// Empty stage folders (all of them when none is selected)
    Clean {
        #[arg(long)]
        preprocessing: bool,

        #[arg(long)]
        features: bool,

        #[arg(long)]
        model: bool,

        #[arg(long)]
        dashboard: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn cmd_train(store: &StageStore, config_path: PathBuf, parallel: bool) -> Result<()> {
    let mut config: TrainConfig = load_config(&config_path)
        .with_context(|| format!("Failed to load train config {}", config_path.display()))?;
    config.parallel |= parallel;

    let artifacts = run_train(store, &config).context("Training failed")?;
    let metrics = &artifacts.metrics;

    println!("\n{}", SEPARATOR);
    println!("Walk-forward ({} windows)", metrics.windows);
    println!("{}", SEPARATOR);
    println!("  Model:       {}", metrics.model_type);
    println!("  Rows:        {}", metrics.n_rows);
    println!("  OOS:         {}", metrics.walk_forward.summary());
    println!("  Baseline:    {}", metrics.baseline.summary());
    match metrics.oos_cutoff_date {
        Some(date) => println!("  OOS cutoff:  {}", date),
        None => println!("  OOS cutoff:  none (no window fits the data)"),
    }
    println!();
    println!("Saved predictions -> {}", artifacts.predictions_path.display());
    println!("Saved model       -> {}", artifacts.model_path.display());
    println!("Saved metrics     -> {}", artifacts.metrics_path.display());
    Ok(())
}

fn cmd_clean(store: &StageStore, selected: Vec<&str>, yes: bool) -> Result<()> {
    let stages = if selected.is_empty() {
        DEFAULT_STAGES.to_vec()
    } else {
        selected
    };

    println!("The following folders will be emptied:");
    for stage in &stages {
        println!(" - {}", store.stage_dir(stage).display());
    }

    if !yes {
        print!("Are you sure? [y/N]: ");
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if answer.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = clean_stages(store, &stages).context("Failed to clean stage folders")?;
    println!("Removed {} entries", removed);
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("alpha_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let store = StageStore::new(&cli.data);
    info!("Data root: {}", store.root().display());

    match cli.command {
        Commands::Preprocess { config } => {
            let cfg: PreprocessConfig = load_config(&config)
                .with_context(|| format!("Failed to load preprocessing config {}", config.display()))?;
            let base = std::env::current_dir()?;
            let path = run_preprocess(&store, &cfg, &base).context("Preprocessing failed")?;
            println!("Saved preprocessed table -> {}", path.display());
        }
        Commands::Features { config } => {
            let cfg: FeaturesConfig = load_config(&config)
                .with_context(|| format!("Failed to load features config {}", config.display()))?;
            let path = run_features(&store, &cfg).context("Feature construction failed")?;
            println!("Saved features table -> {}", path.display());
        }
        Commands::Train { config, parallel } => {
            cmd_train(&store, config, parallel)?;
        }
        Commands::Dashboard { config } => {
            let cfg: DashboardConfig = load_config(&config)
                .with_context(|| format!("Failed to load dashboard config {}", config.display()))?;
            let path = run_dashboard(&store, &cfg).context("Dashboard build failed")?;
            println!("Saved dashboard table -> {}", path.display());
        }
        Commands::Clean {
            preprocessing,
            features,
            model,
            dashboard,
            yes,
        } => {
            let selected: Vec<&str> = [
                (preprocessing, "preprocessing"),
                (features, "features"),
                (model, "model"),
                (dashboard, "dashboard"),
            ]
            .into_iter()
            .filter_map(|(chosen, stage)| chosen.then_some(stage))
            .collect();
            cmd_clean(&store, selected, yes)?;
        }
    }

    Ok(())
}
