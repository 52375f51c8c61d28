//! Model training and cross-validation

use crate::core::{Result, SVMError, Sample};
use crate::kernel::KernelType;
use crate::model::{laplace_scale, sigmoid_train, SvmModel, SvmType, TrainParams};
use crate::optimizer::{DecisionFunction, SVMOptimizer};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

/// Folds used to calibrate probability information
const PROBABILITY_FOLDS: usize = 5;

/// Fold assignment is reproducible from run to run
const SHUFFLE_SEED: u64 = 1;

/// Train a model on labelled samples
///
/// Classification labels are truncated to integers. The kernel is used as
/// given; callers resolve a zero gamma beforehand.
pub fn train_model(samples: &[Sample], params: &TrainParams) -> Result<SvmModel> {
    if samples.is_empty() {
        return Err(SVMError::EmptyDataset);
    }
    params.check()?;

    match params.svm_type {
        SvmType::CSvc => train_classifier(samples, params),
        SvmType::EpsilonSvr => train_regressor(samples, params),
    }
}

/// Predictions for every sample, each made by a model that never saw it
///
/// Folds are contiguous blocks of a seeded shuffle of the data. More folds
/// than samples degrades to leave-one-out.
pub fn cross_validation(samples: &[Sample], params: &TrainParams, nr_fold: usize) -> Result<Vec<f64>> {
    if nr_fold < 2 {
        return Err(SVMError::InvalidParameter(
            "n-fold cross validation: n must >= 2".to_string(),
        ));
    }

    let l = samples.len();
    let nr_fold = if nr_fold > l {
        warn!("# folds ({nr_fold}) > # data ({l}); using leave-one-out cross validation");
        l
    } else {
        nr_fold
    };

    let perm = shuffled_indices(l);
    let mut target = vec![0.0; l];

    for fold in 0..nr_fold {
        let (begin, end) = fold_bounds(fold, nr_fold, l);
        let train: Vec<Sample> = perm[..begin]
            .iter()
            .chain(&perm[end..])
            .map(|&k| samples[k].clone())
            .collect();
        let model = train_model(&train, params)?;

        for &k in &perm[begin..end] {
            let x = &samples[k].features;
            target[k] = if params.probability && params.svm_type.is_classification() {
                model.predict_probability(x).0
            } else {
                model.predict(x)
            };
        }
    }

    Ok(target)
}

/// Samples grouped by class, classes in order of first appearance
struct ClassGroups {
    labels: Vec<i32>,
    start: Vec<usize>,
    count: Vec<usize>,
    /// Sample indices, grouped by class
    order: Vec<usize>,
}

fn group_classes(samples: &[Sample]) -> ClassGroups {
    let mut labels: Vec<i32> = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();

    for (i, sample) in samples.iter().enumerate() {
        let label = sample.label as i32;
        match labels.iter().position(|&l| l == label) {
            Some(k) => members[k].push(i),
            None => {
                labels.push(label);
                members.push(vec![i]);
            }
        }
    }

    // A -1/+1 problem keeps +1 as the first (positive) class
    if labels == [-1, 1] {
        labels.swap(0, 1);
        members.swap(0, 1);
    }

    let count: Vec<usize> = members.iter().map(Vec::len).collect();
    let start = count
        .iter()
        .scan(0, |offset, &c| {
            let s = *offset;
            *offset += c;
            Some(s)
        })
        .collect();

    ClassGroups {
        labels,
        start,
        count,
        order: members.into_iter().flatten().collect(),
    }
}

fn optimizer(params: &TrainParams, c_positive: f64, c_negative: f64) -> SVMOptimizer<KernelType> {
    SVMOptimizer::new(
        Arc::new(params.kernel.clone()),
        params.optimizer_config(c_positive, c_negative),
    )
}

fn train_classifier(samples: &[Sample], params: &TrainParams) -> Result<SvmModel> {
    let groups = group_classes(samples);
    let nr_class = groups.labels.len();
    if nr_class == 1 {
        warn!("training data in only one class; every prediction will be {}", groups.labels[0]);
    }

    for (label, _) in &params.weights {
        if !groups.labels.contains(label) {
            warn!("class label {label} specified in weight is not found");
        }
    }
    let weighted_c: Vec<f64> = groups.labels.iter().map(|&l| params.weighted_c(l)).collect();

    let ordered: Vec<&Sample> = groups.order.iter().map(|&i| &samples[i]).collect();
    let mut nonzero = vec![false; ordered.len()];
    let mut functions: Vec<DecisionFunction> = Vec::new();
    let mut prob_a = Vec::new();
    let mut prob_b = Vec::new();

    for i in 0..nr_class {
        for j in (i + 1)..nr_class {
            let (si, sj) = (groups.start[i], groups.start[j]);
            let (ci, cj) = (groups.count[i], groups.count[j]);

            let sub: Vec<Sample> = ordered[si..si + ci]
                .iter()
                .map(|s| Sample::new(s.features.clone(), 1.0))
                .chain(
                    ordered[sj..sj + cj]
                        .iter()
                        .map(|s| Sample::new(s.features.clone(), -1.0)),
                )
                .collect();

            if params.probability {
                let (a, b) = binary_svc_probability(&sub, params, weighted_c[i], weighted_c[j])?;
                prob_a.push(a);
                prob_b.push(b);
            }

            info!(
                "training class {} vs {}",
                groups.labels[i], groups.labels[j]
            );
            let function = optimizer(params, weighted_c[i], weighted_c[j]).train_binary(&sub)?;

            for k in 0..ci {
                nonzero[si + k] |= function.coef[k] != 0.0;
            }
            for k in 0..cj {
                nonzero[sj + k] |= function.coef[ci + k] != 0.0;
            }
            functions.push(function);
        }
    }

    let n_sv: Vec<usize> = (0..nr_class)
        .map(|c| {
            let s = groups.start[c];
            nonzero[s..s + groups.count[c]].iter().filter(|&&nz| nz).count()
        })
        .collect();
    let support_vectors = ordered
        .iter()
        .zip(&nonzero)
        .filter(|(_, &nz)| nz)
        .map(|(s, _)| s.features.clone())
        .collect::<Vec<_>>();
    let total_sv = support_vectors.len();
    info!("total nSV = {total_sv}");

    let mut nz_start = vec![0; nr_class];
    for c in 1..nr_class {
        nz_start[c] = nz_start[c - 1] + n_sv[c - 1];
    }

    let mut sv_coef = vec![vec![0.0; total_sv]; nr_class.saturating_sub(1)];
    let mut rho = Vec::with_capacity(functions.len());
    let mut pairs = functions.iter();
    for i in 0..nr_class {
        for j in (i + 1)..nr_class {
            let Some(function) = pairs.next() else {
                break;
            };
            let (si, sj) = (groups.start[i], groups.start[j]);
            let (ci, cj) = (groups.count[i], groups.count[j]);

            let mut q = nz_start[i];
            for k in 0..ci {
                if nonzero[si + k] {
                    sv_coef[j - 1][q] = function.coef[k];
                    q += 1;
                }
            }
            let mut q = nz_start[j];
            for k in 0..cj {
                if nonzero[sj + k] {
                    sv_coef[i][q] = function.coef[ci + k];
                    q += 1;
                }
            }
            rho.push(function.rho);
        }
    }

    Ok(SvmModel {
        params: params.clone(),
        nr_class,
        labels: groups.labels,
        n_sv,
        support_vectors,
        sv_coef,
        rho,
        prob_a: params.probability.then_some(prob_a),
        prob_b: params.probability.then_some(prob_b),
    })
}

fn train_regressor(samples: &[Sample], params: &TrainParams) -> Result<SvmModel> {
    let prob_a = if params.probability {
        Some(vec![svr_probability(samples, params)?])
    } else {
        None
    };

    let function = optimizer(params, params.c, params.c).train_regression(samples, params.p)?;

    let (support_vectors, coef): (Vec<_>, Vec<_>) = samples
        .iter()
        .zip(&function.coef)
        .filter(|(_, &c)| c != 0.0)
        .map(|(s, &c)| (s.features.clone(), c))
        .unzip();
    info!("nSV = {}", support_vectors.len());

    Ok(SvmModel {
        params: params.clone(),
        nr_class: 2,
        labels: Vec::new(),
        n_sv: Vec::new(),
        support_vectors,
        sv_coef: vec![coef],
        rho: vec![function.rho],
        prob_a,
        prob_b: None,
    })
}

/// Platt sigmoid parameters for one class pair from cross-validated decision values
fn binary_svc_probability(
    samples: &[Sample],
    params: &TrainParams,
    c_positive: f64,
    c_negative: f64,
) -> Result<(f64, f64)> {
    let l = samples.len();
    let perm = shuffled_indices(l);
    let mut dec_values = vec![0.0; l];
    let kernel = params.kernel.clone();

    for fold in 0..PROBABILITY_FOLDS {
        let (begin, end) = fold_bounds(fold, PROBABILITY_FOLDS, l);
        let train: Vec<Sample> = perm[..begin]
            .iter()
            .chain(&perm[end..])
            .map(|&k| samples[k].clone())
            .collect();

        let positives = train.iter().filter(|s| s.label > 0.0).count();
        let negatives = train.len() - positives;

        let constant = match (positives, negatives) {
            (0, 0) => Some(0.0),
            (_, 0) => Some(1.0),
            (0, _) => Some(-1.0),
            _ => None,
        };

        match constant {
            Some(value) => {
                for &k in &perm[begin..end] {
                    dec_values[k] = value;
                }
            }
            None => {
                let function = optimizer(params, c_positive, c_negative).train_binary(&train)?;
                for &k in &perm[begin..end] {
                    dec_values[k] = function.evaluate(&kernel, &train, &samples[k]);
                }
            }
        }
    }

    let labels: Vec<f64> = samples.iter().map(|s| s.label).collect();
    Ok(sigmoid_train(&dec_values, &labels))
}

/// Laplace scale of the cross-validated residuals
fn svr_probability(samples: &[Sample], params: &TrainParams) -> Result<f64> {
    let plain = TrainParams {
        probability: false,
        ..params.clone()
    };
    let predictions = cross_validation(samples, &plain, PROBABILITY_FOLDS)?;
    let residuals: Vec<f64> = samples
        .iter()
        .zip(&predictions)
        .map(|(s, p)| s.label - p)
        .collect();
    Ok(laplace_scale(&residuals))
}

fn shuffled_indices(l: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);
    let mut perm: Vec<usize> = (0..l).collect();
    perm.shuffle(&mut rng);
    perm
}

fn fold_bounds(fold: usize, nr_fold: usize, l: usize) -> (usize, usize) {
    (fold * l / nr_fold, (fold + 1) * l / nr_fold)
}
