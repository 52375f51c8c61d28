//! `predict` dispatcher
//!
//! Predicts a single sample held in memory instead of reading a test file.
//! Element `i` of the buffer is feature `i`; zeros are kept as explicit
//! entries.

use crate::command::{usage_error, ArgumentVector};
use crate::core::{PredictionResult, Result, SVMError, SparseVector};
use crate::model::{load_model, SvmModel, SvmType};
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

pub const PREDICT_USAGE: &str = "\
Usage: predict [options] model_file
options:
-b probability_estimates: whether to predict probability estimates, 0 or 1 (default 0)
-q : quiet mode (no outputs)
Options must come before model_file; anything after it is ignored.";

#[derive(Parser, Debug)]
#[command(
    name = crate::command::PROGRAM_NAME,
    disable_help_flag = true,
    allow_negative_numbers = true
)]
struct PredictArgs {
    #[arg(short = 'b', default_value_t = 0)]
    probability: i32,

    #[arg(short = 'q')]
    quiet: bool,

    model_file: PathBuf,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    ignored: Vec<String>,
}

/// Run `predict` on one dense sample
///
/// Errors are reported in a fixed order: malformed arguments first, then
/// an unreadable model, then a probability request the model cannot serve.
pub fn run(argv: &ArgumentVector, input: &[f32]) -> Result<PredictionResult> {
    argv.require_arguments(PREDICT_USAGE)?;
    let options = PredictArgs::try_parse_from(argv.as_slice()).map_err(usage_error(PREDICT_USAGE))?;
    if options.quiet {
        debug!("quiet mode requested");
    }
    if !options.ignored.is_empty() {
        debug!("ignoring arguments after the model file: {:?}", options.ignored);
    }

    let model = load_model(&options.model_file)?;
    let probability = options.probability != 0;

    if probability {
        if !model.check_probability_model() {
            return Err(SVMError::ProbabilityNotSupported);
        }
    } else if model.check_probability_model() {
        warn!("Model supports probability estimates, but disabled in prediction.");
    }

    let x = SparseVector::from_dense(input);
    predict_with_model(&model, &x, probability)
}

/// Predict `x` with an already loaded model
///
/// With `probability` set, classifiers report the estimate of the label
/// they predict; regressors only log their Laplace scale and report 0.
pub fn predict_with_model(model: &SvmModel, x: &SparseVector, probability: bool) -> Result<PredictionResult> {
    if probability {
        match model.svm_type() {
            SvmType::CSvc => {
                let (label, estimates) = model.predict_probability(x);
                let estimates = estimates.ok_or(SVMError::ProbabilityNotSupported)?;
                let index = label as i32;
                let p = model.probability_of(index, &estimates)?;
                return Ok(PredictionResult::new(index, p));
            }
            SvmType::EpsilonSvr => {
                if let Some(sigma) = model.svr_probability() {
                    info!(
                        "Prob. model for test data: target value = predicted value + z,\n\
                         z: Laplace distribution e^(-|z|/sigma)/(2sigma),sigma={sigma}"
                    );
                }
            }
        }
    }

    Ok(PredictionResult::new(model.predict(x) as i32, 0.0))
}
