//! Sequential Minimal Optimization (SMO) solver
//!
//! Solves the binary C-SVC dual problem for one class pair by repeatedly
//! optimizing pairs of Lagrange multipliers. Labels must be +1/-1; each
//! variable's box bound comes from its label (`c_positive` / `c_negative`),
//! which is how per-class weights reach the solver.

use crate::cache::KernelCache;
use crate::core::{OptimizationResult, OptimizerConfig, Result, SVMError, Sample};
use crate::kernel::Kernel;
use crate::solver::shrinking::ShrinkingStrategy;
use log::debug;
use std::sync::Arc;

/// SMO solver for binary classification sub-problems
pub struct SMOSolver<K: Kernel> {
    kernel: Arc<K>,
    config: OptimizerConfig,
}

impl<K: Kernel> SMOSolver<K> {
    pub fn new(kernel: Arc<K>, config: OptimizerConfig) -> Self {
        Self { kernel, config }
    }

    fn kernel_cached(
        &self,
        cache: &mut KernelCache,
        samples: &[Sample],
        i: usize,
        j: usize,
    ) -> f64 {
        cache.get_or_compute(i, j, || {
            self.kernel
                .compute(&samples[i].features, &samples[j].features)
        })
    }

    /// Solve the dual problem with a cache sized from `config.cache_size`
    pub fn solve(&self, samples: &[Sample]) -> Result<OptimizationResult> {
        let mut cache = KernelCache::with_memory_limit(self.config.cache_size, samples.len());
        self.solve_with_cache(samples, &mut cache)
    }

    /// Solve the dual problem using the given kernel cache
    ///
    /// Cache indices are positions in `samples`.
    pub fn solve_with_cache(
        &self,
        samples: &[Sample],
        cache: &mut KernelCache,
    ) -> Result<OptimizationResult> {
        if samples.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        for sample in samples {
            if sample.label != 1.0 && sample.label != -1.0 {
                return Err(SVMError::InvalidParameter(format!(
                    "binary sub-problem label must be +1 or -1, got {}",
                    sample.label
                )));
            }
        }

        let n = samples.len();
        let bounds: Vec<f64> = samples.iter().map(|s| self.config.bound(s.label)).collect();

        let mut alpha = vec![0.0; n];

        // E_i = f(x_i) - y_i without the bias; all alphas start at zero
        let mut error_cache: Vec<f64> = samples.iter().map(|s| -s.label).collect();

        let mut shrinking_strategy = if self.config.shrinking {
            Some(ShrinkingStrategy::new(n, self.config.shrinking_iterations))
        } else {
            None
        };

        let mut active_set: Vec<usize> = (0..n).collect();

        let mut iterations = 0;
        let mut num_changed = 0;
        let mut examine_all = true;
        let mut shrinking_counter = 0;

        while (num_changed > 0 || examine_all) && iterations < self.config.max_iterations {
            num_changed = 0;

            for idx in 0..active_set.len() {
                let i = active_set[idx];
                let non_bound = alpha[i] > 0.0 && alpha[i] < bounds[i];
                if (examine_all || non_bound)
                    && self.examine_example(
                        i,
                        samples,
                        &bounds,
                        &mut alpha,
                        &mut error_cache,
                        &active_set,
                        cache,
                    )
                {
                    num_changed += 1;
                }
            }

            if let Some(ref mut strategy) = shrinking_strategy {
                strategy.update(&alpha, &error_cache, samples, &bounds);

                shrinking_counter += 1;
                if shrinking_counter >= self.config.shrinking_iterations
                    && strategy.has_sufficient_history()
                {
                    let (shrink_to_lower, shrink_to_upper) = strategy.get_shrinkable_variables();

                    if !shrink_to_lower.is_empty() || !shrink_to_upper.is_empty() {
                        let before = active_set.len();
                        active_set.retain(|&i| {
                            if shrink_to_lower.contains(&i) {
                                alpha[i] = 0.0;
                                false
                            } else if shrink_to_upper.contains(&i) {
                                alpha[i] = bounds[i];
                                false
                            } else {
                                true
                            }
                        });

                        if active_set.len() < before {
                            debug!("shrunk {} variables", before - active_set.len());
                            self.refresh_error_cache(
                                &mut error_cache,
                                &alpha,
                                samples,
                                &active_set,
                                cache,
                            );
                        }
                    }

                    shrinking_counter = 0;
                }
            }

            if examine_all {
                examine_all = false;
            } else if num_changed == 0 {
                examine_all = true;
            }

            iterations += 1;
        }

        let bias = self.calculate_bias(&alpha, &bounds, &error_cache);

        let support_vectors: Vec<usize> = alpha
            .iter()
            .enumerate()
            .filter_map(|(i, &a)| if a > 0.0 { Some(i) } else { None })
            .collect();

        let objective_value = self.calculate_objective(&alpha, samples, &support_vectors, cache);

        debug!(
            "smo finished: #iter = {iterations}, nSV = {}, obj = {objective_value}",
            support_vectors.len()
        );

        Ok(OptimizationResult {
            alpha,
            b: bias,
            support_vectors,
            iterations,
            objective_value,
        })
    }

    /// Examine one multiplier for a KKT violation and try to optimize it
    #[allow(clippy::too_many_arguments)]
    fn examine_example(
        &self,
        i: usize,
        samples: &[Sample],
        bounds: &[f64],
        alpha: &mut [f64],
        error_cache: &mut [f64],
        active_set: &[usize],
        cache: &mut KernelCache,
    ) -> bool {
        let y_i = samples[i].label;
        let e_i = error_cache[i];
        let r_i = e_i * y_i;

        // - r_i < -epsilon and alpha_i < C_i (can increase alpha_i)
        // - r_i > epsilon and alpha_i > 0 (can decrease alpha_i)
        let violates = (r_i < -self.config.epsilon && alpha[i] < bounds[i])
            || (r_i > self.config.epsilon && alpha[i] > 0.0);

        if !violates {
            return false;
        }

        match Self::select_second_variable(i, e_i, error_cache, active_set) {
            Some(j) => self.take_step(i, j, samples, bounds, alpha, error_cache, cache),
            None => false,
        }
    }

    /// Second-choice heuristic: maximum |E_i - E_j| over the active set
    fn select_second_variable(
        i: usize,
        e_i: f64,
        error_cache: &[f64],
        active_set: &[usize],
    ) -> Option<usize> {
        let mut best_j = None;
        let mut max_diff = 0.0;

        for &j in active_set {
            if j == i {
                continue;
            }
            let diff = (e_i - error_cache[j]).abs();
            if diff > max_diff {
                max_diff = diff;
                best_j = Some(j);
            }
        }

        best_j
    }

    /// Jointly optimize alpha_i and alpha_j
    #[allow(clippy::too_many_arguments)]
    fn take_step(
        &self,
        i: usize,
        j: usize,
        samples: &[Sample],
        bounds: &[f64],
        alpha: &mut [f64],
        error_cache: &mut [f64],
        cache: &mut KernelCache,
    ) -> bool {
        if i == j {
            return false;
        }

        let y_i = samples[i].label;
        let y_j = samples[j].label;
        let (c_i, c_j) = (bounds[i], bounds[j]);
        let alpha_i_old = alpha[i];
        let alpha_j_old = alpha[j];
        let e_i = error_cache[i];
        let e_j = error_cache[j];

        let s = y_i * y_j;

        let (low, high) = if y_i != y_j {
            let diff = alpha_j_old - alpha_i_old;
            (diff.max(0.0), c_j.min(c_i + diff))
        } else {
            let sum = alpha_i_old + alpha_j_old;
            ((sum - c_i).max(0.0), c_j.min(sum))
        };

        if low >= high {
            return false;
        }

        let k_ii = self.kernel_cached(cache, samples, i, i);
        let k_ij = self.kernel_cached(cache, samples, i, j);
        let k_jj = self.kernel_cached(cache, samples, j, j);

        let eta = k_ii + k_jj - 2.0 * k_ij;
        if eta <= 0.0 {
            // Non positive-definite pair; leave it for another partner
            return false;
        }

        let alpha_j_new = (alpha_j_old + y_j * (e_i - e_j) / eta).clamp(low, high);

        if (alpha_j_new - alpha_j_old).abs()
            < self.config.epsilon * (alpha_j_new + alpha_j_old + self.config.epsilon)
        {
            return false;
        }

        let alpha_i_new = alpha_i_old + s * (alpha_j_old - alpha_j_new);

        alpha[i] = alpha_i_new;
        alpha[j] = alpha_j_new;

        let delta_alpha_i = alpha_i_new - alpha_i_old;
        let delta_alpha_j = alpha_j_new - alpha_j_old;

        for k in 0..samples.len() {
            let k_ik = self.kernel_cached(cache, samples, i, k);
            let k_jk = self.kernel_cached(cache, samples, j, k);
            error_cache[k] += y_i * delta_alpha_i * k_ik + y_j * delta_alpha_j * k_jk;
        }

        true
    }

    /// Bias from free support vectors, falling back to all support vectors
    fn calculate_bias(&self, alpha: &[f64], bounds: &[f64], error_cache: &[f64]) -> f64 {
        let mean_negated = |filter: &dyn Fn(usize) -> bool| {
            let (sum, count) = (0..alpha.len())
                .filter(|&i| filter(i))
                .fold((0.0, 0usize), |(sum, count), i| (sum + error_cache[i], count + 1));
            if count > 0 {
                Some(-sum / count as f64)
            } else {
                None
            }
        };

        let eps = self.config.epsilon;
        mean_negated(&|i| alpha[i] > eps && alpha[i] < bounds[i] - eps)
            .or_else(|| mean_negated(&|i| alpha[i] > 0.0))
            .unwrap_or(0.0)
    }

    /// Dual objective: sum(alpha) - 1/2 sum_ij alpha_i alpha_j y_i y_j K_ij
    fn calculate_objective(
        &self,
        alpha: &[f64],
        samples: &[Sample],
        support_vectors: &[usize],
        cache: &mut KernelCache,
    ) -> f64 {
        let mut obj: f64 = support_vectors.iter().map(|&i| alpha[i]).sum();

        for &i in support_vectors {
            for &j in support_vectors {
                let k_ij = self.kernel_cached(cache, samples, i, j);
                obj -= 0.5 * alpha[i] * alpha[j] * samples[i].label * samples[j].label * k_ij;
            }
        }

        obj
    }

    /// Recompute E_i for the active set after variables were pinned to bounds
    fn refresh_error_cache(
        &self,
        error_cache: &mut [f64],
        alpha: &[f64],
        samples: &[Sample],
        active_set: &[usize],
        cache: &mut KernelCache,
    ) {
        for &i in active_set {
            let mut output = 0.0;
            for j in 0..samples.len() {
                if alpha[j] > 0.0 {
                    output += alpha[j] * samples[j].label * self.kernel_cached(cache, samples, i, j);
                }
            }
            error_cache[i] = output - samples[i].label;
        }
    }
}
