//! svmbridge command line interface
//!
//! Thin wrapper over the library entry points: each subcommand takes the
//! command string of the matching toolkit routine as a single argument.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use svmbridge::{api, Result, SVMError};

#[derive(Parser)]
#[command(name = "svmbridge")]
#[command(about = "Run libsvm-style train, predict and scale in-process")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "svmbridge contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model, e.g. "-t 0 -c 4 train.txt svm.model"
    Train(TrainArgs),
    /// Predict one sample, e.g. "-b 1 svm.model"
    Predict(PredictArgs),
    /// Scale a data file, e.g. "-l 0 -u 1 train.txt"
    Scale(ScaleArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Train command string
    #[arg(allow_hyphen_values = true)]
    command: String,
}

#[derive(Args)]
struct PredictArgs {
    /// Predict command string
    #[arg(allow_hyphen_values = true)]
    command: String,

    /// File of whitespace-separated feature values (stdin if omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[derive(Args)]
struct ScaleArgs {
    /// Scale command string
    #[arg(allow_hyphen_values = true)]
    command: String,

    /// File receiving the scaled data
    #[arg(short, long)]
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => api::train(&args.command),
        Commands::Predict(args) => predict_command(args),
        Commands::Scale(args) => api::scale(&args.command, &args.output),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let text = match &args.input {
        Some(path) => {
            info!("Reading features from {path:?}");
            fs::read_to_string(path)?
        }
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let values = parse_values(&text)?;
    let result = api::predict(&args.command, &values)?;
    println!("{} {}", result.index, result.probability);
    Ok(())
}

fn parse_values(text: &str) -> Result<Vec<f32>> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|e| SVMError::ParseError(format!("invalid feature value '{token}': {e}")))
        })
        .collect()
}
