//! Binary and regression sub-problem training
//!
//! This module connects kernels with the solvers and turns a solver result
//! into a [`DecisionFunction`], the unit the multi-class model is built from.

use crate::core::{OptimizerConfig, Result, Sample};
use crate::kernel::Kernel;
use crate::solver::{SMOSolver, SVRSolver};
use log::info;
use std::sync::Arc;

/// `f(x) = sum(coef_i * K(x_i, x)) - rho` over the training points of one sub-problem
///
/// `coef` has one entry per training point; points with a zero coefficient
/// are not support vectors.
#[derive(Debug, Clone)]
pub struct DecisionFunction {
    pub coef: Vec<f64>,
    pub rho: f64,
}

impl DecisionFunction {
    /// Positions of the support vectors (non-zero coefficients)
    pub fn support_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.coef
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != 0.0)
            .map(|(i, _)| i)
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_indices().count()
    }

    /// Evaluate on `x` against the training points the function was fitted on
    pub fn evaluate<K: Kernel>(&self, kernel: &K, samples: &[Sample], x: &Sample) -> f64 {
        self.support_indices()
            .map(|i| self.coef[i] * kernel.compute(&samples[i].features, &x.features))
            .sum::<f64>()
            - self.rho
    }
}

/// Trains one sub-problem with a fixed kernel and solver configuration
pub struct SVMOptimizer<K: Kernel> {
    kernel: Arc<K>,
    config: OptimizerConfig,
}

impl<K: Kernel> SVMOptimizer<K> {
    pub fn new(kernel: Arc<K>, config: OptimizerConfig) -> Self {
        Self { kernel, config }
    }

    /// Train a C-SVC sub-problem on +1/-1 labelled samples
    ///
    /// `c_positive`/`c_negative` of the configuration are the per-class bounds.
    pub fn train_binary(&self, samples: &[Sample]) -> Result<DecisionFunction> {
        let solver = SMOSolver::new(Arc::clone(&self.kernel), self.config.clone());
        let result = solver.solve(samples)?;

        // Solver reports sum(alpha y K) + b
        let coef = result
            .alpha
            .iter()
            .zip(samples)
            .map(|(alpha, s)| alpha * s.label)
            .collect();

        info!(
            "binary sub-problem: {} samples, nSV = {}, #iter = {}, obj = {:.6}",
            samples.len(),
            result.support_vectors.len(),
            result.iterations,
            result.objective_value
        );

        Ok(DecisionFunction {
            coef,
            rho: -result.b,
        })
    }

    /// Train an epsilon-SVR problem on real-valued targets
    ///
    /// `tube` is the insensitive-loss width; the box bound is `c_positive`.
    pub fn train_regression(&self, samples: &[Sample], tube: f64) -> Result<DecisionFunction> {
        let solver = SVRSolver::new(Arc::clone(&self.kernel), self.config.clone(), tube);
        let solution = solver.solve(samples)?;

        info!(
            "regression problem: {} samples, #iter = {}",
            samples.len(),
            solution.iterations
        );

        Ok(DecisionFunction {
            coef: solution.coef,
            rho: solution.rho,
        })
    }
}
