//! Entry points for host applications
//!
//! Each call takes a command string in the style of the classic command
//! line tools, minus the program name, and runs the routine in-process.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use svmbridge::api;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! api::scale("-l 0 -u 1 -s range.txt train.txt", "train.scaled")?;
//! api::train("-t 2 -c 4 -b 1 train.scaled svm.model")?;
//!
//! let result = api::predict("-b 1 svm.model", &[0.5, 0.0, 0.25])?;
//! println!("class {} with probability {:.3}", result.index, result.probability);
//! # Ok(())
//! # }
//! ```

use crate::command::{self, ArgumentVector};
use crate::core::{PredictionResult, Result};
use log::debug;
use std::path::Path;

/// Train a model, or cross-validate with `-v n`
///
/// The model is written to the file named in the command.
pub fn train(command: &str) -> Result<()> {
    debug!("train {command}");
    command::train::run(&ArgumentVector::from_command(command))
}

/// Scale a data file, writing the scaled data to `output_path`
pub fn scale<P: AsRef<Path>>(command: &str, output_path: P) -> Result<()> {
    debug!("scale {command} > {}", output_path.as_ref().display());
    command::scale::run(&ArgumentVector::from_command(command), output_path.as_ref())
}

/// Predict one sample held in memory
///
/// `input[i]` is the value of feature `i`. The model file is read on every
/// call.
pub fn predict(command: &str, input: &[f32]) -> Result<PredictionResult> {
    debug!("predict {command} on {} values", input.len());
    command::predict::run(&ArgumentVector::from_command(command), input)
}
