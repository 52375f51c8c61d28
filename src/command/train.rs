//! `train` dispatcher

use crate::command::{usage_error, ArgumentVector};
use crate::core::{Dataset, Result, SVMError, Sample};
use crate::data::LibSVMDataset;
use crate::kernel::KernelType;
use crate::model::{cross_validation, save_model, train_model, SvmType, TrainParams};
use crate::redirect;
use clap::Parser;
use log::{debug, info};
use std::io::Write;
use std::path::PathBuf;

pub const TRAIN_USAGE: &str = "\
Usage: train [options] training_set_file [model_file]
options:
-s svm_type : set type of SVM (default 0)
\t0 -- C-SVC
\t3 -- epsilon-SVR
-t kernel_type : set type of kernel function (default 2)
\t0 -- linear: u'*v
\t1 -- polynomial: (gamma*u'*v + coef0)^degree
\t2 -- radial basis function: exp(-gamma*|u-v|^2)
\t3 -- sigmoid: tanh(gamma*u'*v + coef0)
-d degree : set degree in kernel function (default 3)
-g gamma : set gamma in kernel function (default 1/num_features)
-r coef0 : set coef0 in kernel function (default 0)
-c cost : set the parameter C of C-SVC and epsilon-SVR (default 1)
-p epsilon : set the epsilon in loss function of epsilon-SVR (default 0.1)
-m cachesize : set cache memory size in MB (default 100)
-e epsilon : set tolerance of termination criterion (default 0.001)
-h shrinking : whether to use the shrinking heuristics, 0 or 1 (default 1)
-b probability_estimates : whether to train a model for probability estimates, 0 or 1 (default 0)
-wi weight : set the parameter C of class i to weight*C (default 1)
-v n : n-fold cross validation mode
-q : quiet mode (no outputs)";

#[derive(Parser, Debug)]
#[command(
    name = crate::command::PROGRAM_NAME,
    disable_help_flag = true,
    allow_negative_numbers = true
)]
struct TrainArgs {
    #[arg(short = 's', default_value_t = 0)]
    svm_type: i32,

    #[arg(short = 't', default_value_t = 2)]
    kernel_type: i32,

    #[arg(short = 'd', default_value_t = 3)]
    degree: i32,

    /// Zero means 1/num_features
    #[arg(short = 'g', default_value_t = 0.0)]
    gamma: f64,

    #[arg(short = 'r', default_value_t = 0.0)]
    coef0: f64,

    #[arg(short = 'c', default_value_t = 1.0)]
    cost: f64,

    #[arg(short = 'p', default_value_t = 0.1)]
    loss_epsilon: f64,

    #[arg(short = 'm', default_value_t = 100.0)]
    cache_size: f64,

    #[arg(short = 'e', default_value_t = 0.001)]
    tolerance: f64,

    #[arg(short = 'h', default_value_t = 1)]
    shrinking: i32,

    #[arg(short = 'b', default_value_t = 0)]
    probability: i32,

    #[arg(short = 'v')]
    folds: Option<usize>,

    #[arg(short = 'q')]
    quiet: bool,

    training_set_file: PathBuf,

    model_file: Option<PathBuf>,
}

impl TrainArgs {
    fn params(&self, weights: Vec<(i32, f64)>) -> Result<TrainParams> {
        Ok(TrainParams {
            svm_type: SvmType::from_code(self.svm_type)?,
            kernel: KernelType::from_code(self.kernel_type, self.degree, self.gamma, self.coef0)?,
            c: self.cost,
            eps: self.tolerance,
            p: self.loss_epsilon,
            cache_size: self.cache_size,
            shrinking: flag(self.shrinking, "shrinking")?,
            probability: flag(self.probability, "probability")?,
            weights,
        })
    }

    /// The explicit model path, or the training file's name plus `.model`
    fn model_path(&self) -> PathBuf {
        if let Some(path) = &self.model_file {
            return path.clone();
        }
        let name = self
            .training_set_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        PathBuf::from(format!("{name}.model"))
    }
}

fn flag(value: i32, what: &str) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(SVMError::InvalidParameter(format!("{what} != 0 and {what} != 1"))),
    }
}

/// Pull `-w<label> <weight>` pairs out of the tokens
///
/// The label is glued to the flag, which clap cannot express, so these are
/// removed before the remaining tokens are parsed.
fn extract_weights(args: &[String]) -> Result<(Vec<String>, Vec<(i32, f64)>)> {
    let mut rest = Vec::with_capacity(args.len());
    let mut weights = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let Some(label) = arg.strip_prefix("-w") else {
            rest.push(arg.clone());
            continue;
        };
        let bad = || SVMError::Usage(format!("invalid class weight option '{arg}'\n{TRAIN_USAGE}"));
        let label = label.parse::<i32>().map_err(|_| bad())?;
        let weight = iter
            .next()
            .and_then(|w| w.parse::<f64>().ok())
            .ok_or_else(bad)?;
        weights.push((label, weight));
    }

    Ok((rest, weights))
}

/// Run `train` with the given arguments
///
/// Trains and saves a model, or in `-v n` mode prints the cross-validation
/// figures to the output sink and saves nothing.
pub fn run(argv: &ArgumentVector) -> Result<()> {
    argv.require_arguments(TRAIN_USAGE)?;

    let (args, weights) = extract_weights(argv.as_slice())?;
    let options = TrainArgs::try_parse_from(args).map_err(usage_error(TRAIN_USAGE))?;
    if let Some(n) = options.folds {
        if n < 2 {
            return Err(SVMError::Usage(format!(
                "n-fold cross validation: n must >= 2\n{TRAIN_USAGE}"
            )));
        }
    }
    if options.quiet {
        debug!("quiet mode requested");
    }

    let mut params = options.params(weights)?;
    let dataset = LibSVMDataset::from_file(&options.training_set_file)?;
    params.kernel = params
        .kernel
        .with_default_gamma(dataset.max_index().unwrap_or(0));
    params.check()?;

    info!(
        "training {:?} with {} kernel on {} samples of dimension {}",
        params.svm_type,
        params.kernel.name(),
        dataset.len(),
        dataset.dim()
    );

    match options.folds {
        Some(nr_fold) => {
            let predictions = cross_validation(dataset.as_samples(), &params, nr_fold)?;
            redirect::with_exclusive_output(|out| {
                report_cross_validation(dataset.as_samples(), &predictions, params.svm_type, out)
            })
        }
        None => {
            let model = train_model(dataset.as_samples(), &params)?;
            let path = options.model_path();
            save_model(&model, &path)?;
            info!("model with {} support vectors saved to {}", model.total_sv(), path.display());
            Ok(())
        }
    }
}

/// Print accuracy, or mean squared error and squared correlation
fn report_cross_validation<W: Write>(
    samples: &[Sample],
    predictions: &[f64],
    svm_type: SvmType,
    out: &mut W,
) -> Result<()> {
    let l = samples.len() as f64;

    if svm_type.is_classification() {
        let correct = samples
            .iter()
            .zip(predictions)
            .filter(|&(s, &p)| s.label == p)
            .count();
        writeln!(out, "Cross Validation Accuracy = {}%", 100.0 * correct as f64 / l)?;
    } else {
        let (mut error, mut sum_v, mut sum_y, mut sum_vv, mut sum_yy, mut sum_vy) =
            (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        for (sample, &v) in samples.iter().zip(predictions) {
            let y = sample.label;
            error += (v - y) * (v - y);
            sum_v += v;
            sum_y += y;
            sum_vv += v * v;
            sum_yy += y * y;
            sum_vy += v * y;
        }
        let numerator = l * sum_vy - sum_v * sum_y;
        let r2 = numerator * numerator / ((l * sum_vv - sum_v * sum_v) * (l * sum_yy - sum_y * sum_y));
        writeln!(out, "Cross Validation Mean squared error = {}", error / l)?;
        writeln!(out, "Cross Validation Squared correlation coefficient = {r2}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SparseVector;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_extract_weights() {
        let (rest, weights) =
            extract_weights(&strings(&["svmbridge", "-w1", "2.5", "-t", "0", "-w-1", "0.5", "data"])).unwrap();

        assert_eq!(rest, strings(&["svmbridge", "-t", "0", "data"]));
        assert_eq!(weights, vec![(1, 2.5), (-1, 0.5)]);
    }

    #[test]
    fn test_extract_weights_rejects_missing_value() {
        assert!(matches!(
            extract_weights(&strings(&["svmbridge", "data", "-w1"])),
            Err(SVMError::Usage(_))
        ));
        assert!(matches!(
            extract_weights(&strings(&["svmbridge", "-wx", "1", "data"])),
            Err(SVMError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_defaults() {
        let args = TrainArgs::try_parse_from(["svmbridge", "heart_scale"]).unwrap();
        let params = args.params(Vec::new()).unwrap();

        assert_eq!(params, TrainParams::default());
        assert_eq!(args.model_path(), PathBuf::from("heart_scale.model"));
        assert_eq!(args.folds, None);
    }

    #[test]
    fn test_parse_all_flags() {
        let args = TrainArgs::try_parse_from([
            "svmbridge", "-s", "3", "-t", "1", "-d", "2", "-g", "0.5", "-r", "-1", "-c", "10", "-p", "0.2",
            "-m", "40", "-e", "0.01", "-h", "0", "-b", "1", "-q", "/data/train.txt", "out.model",
        ])
        .unwrap();
        let params = args.params(vec![(1, 2.0)]).unwrap();

        assert_eq!(params.svm_type, SvmType::EpsilonSvr);
        assert_eq!(
            params.kernel,
            KernelType::Polynomial {
                degree: 2,
                gamma: 0.5,
                coef0: -1.0
            }
        );
        assert_eq!(params.c, 10.0);
        assert_eq!(params.p, 0.2);
        assert_eq!(params.cache_size, 40.0);
        assert_eq!(params.eps, 0.01);
        assert!(!params.shrinking);
        assert!(params.probability);
        assert_eq!(params.weights, vec![(1, 2.0)]);
        assert!(args.quiet);
        assert_eq!(args.model_path(), PathBuf::from("out.model"));
    }

    #[test]
    fn test_default_model_path_uses_file_name() {
        let args = TrainArgs::try_parse_from(["svmbridge", "/tmp/sets/a1a.train"]).unwrap();
        assert_eq!(args.model_path(), PathBuf::from("a1a.train.model"));
    }

    #[test]
    fn test_unsupported_types_rejected() {
        let args = TrainArgs::try_parse_from(["svmbridge", "-s", "2", "data"]).unwrap();
        assert!(matches!(args.params(Vec::new()), Err(SVMError::InvalidParameter(_))));

        let args = TrainArgs::try_parse_from(["svmbridge", "-t", "4", "data"]).unwrap();
        assert!(matches!(args.params(Vec::new()), Err(SVMError::InvalidParameter(_))));

        let args = TrainArgs::try_parse_from(["svmbridge", "-b", "2", "data"]).unwrap();
        assert!(matches!(args.params(Vec::new()), Err(SVMError::InvalidParameter(_))));
    }

    #[test]
    fn test_run_usage_errors() {
        assert!(matches!(run(&ArgumentVector::from_command("")), Err(SVMError::Usage(_))));
        assert!(matches!(run(&ArgumentVector::from_command("-z 1 data")), Err(SVMError::Usage(_))));
        assert!(matches!(run(&ArgumentVector::from_command("-t 0")), Err(SVMError::Usage(_))));
        assert!(matches!(run(&ArgumentVector::from_command("-v 1 data")), Err(SVMError::Usage(_))));
    }

    #[test]
    fn test_report_classification() {
        let samples: Vec<Sample> = [1.0, 1.0, -1.0, -1.0]
            .iter()
            .map(|&y| Sample::new(SparseVector::empty(), y))
            .collect();
        let mut out = Vec::new();
        report_cross_validation(&samples, &[1.0, -1.0, -1.0, -1.0], SvmType::CSvc, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Cross Validation Accuracy = 75%\n");
    }

    #[test]
    fn test_report_regression() {
        let samples: Vec<Sample> = [1.0, 2.0, 3.0]
            .iter()
            .map(|&y| Sample::new(SparseVector::empty(), y))
            .collect();
        let mut out = Vec::new();
        report_cross_validation(&samples, &[1.0, 2.0, 3.0], SvmType::EpsilonSvr, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Cross Validation Mean squared error = 0\nCross Validation Squared correlation coefficient = 1\n"
        );
    }
}
