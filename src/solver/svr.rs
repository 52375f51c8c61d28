//! Epsilon-SVR solver
//!
//! The epsilon-SVR dual has 2l variables: `alpha_i` (y = +1) and `alpha*_i`
//! (y = -1), both bounded by C and tied to the same training point. It is
//! solved as
//!
//! ```text
//! min 1/2 a^T Q a + p^T a    s.t.  y^T a = 0,  0 <= a_t <= C
//! Q_st = y_s y_t K(x_{s mod l}, x_{t mod l})
//! p_t  = epsilon - z_t (t < l),  epsilon + z_{t-l} (t >= l)
//! ```
//!
//! with a first-order maximal-violating-pair working set selection.

use crate::cache::KernelCache;
use crate::core::{OptimizerConfig, Result, SVMError, Sample};
use crate::kernel::Kernel;
use log::{debug, warn};
use std::sync::Arc;

/// Used in place of a non-positive curvature
const TAU: f64 = 1e-12;

/// Solution of an epsilon-SVR problem
#[derive(Debug, Clone)]
pub struct RegressionSolution {
    /// `alpha_i - alpha*_i` for every training point
    pub coef: Vec<f64>,
    /// Decision function is `sum(coef_i * K(x_i, x)) - rho`
    pub rho: f64,
    pub iterations: usize,
}

/// Epsilon-insensitive support vector regression solver
pub struct SVRSolver<K: Kernel> {
    kernel: Arc<K>,
    config: OptimizerConfig,
    /// Width of the insensitive tube (`-p`)
    tube: f64,
}

impl<K: Kernel> SVRSolver<K> {
    pub fn new(kernel: Arc<K>, config: OptimizerConfig, tube: f64) -> Self {
        Self {
            kernel,
            config,
            tube,
        }
    }

    /// Q_st including the sign of both variables
    fn q(&self, cache: &mut KernelCache, samples: &[Sample], s: usize, t: usize) -> f64 {
        let l = samples.len();
        let (ds, dt) = (s % l, t % l);
        let k = cache.get_or_compute(ds, dt, || {
            self.kernel
                .compute(&samples[ds].features, &samples[dt].features)
        });
        sign(s, l) * sign(t, l) * k
    }

    pub fn solve(&self, samples: &[Sample]) -> Result<RegressionSolution> {
        if samples.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        let l = samples.len();
        let n = 2 * l;
        let c = self.config.c_positive;
        let mut cache = KernelCache::with_memory_limit(self.config.cache_size, l);

        let mut alpha = vec![0.0; n];
        // Gradient Q a + p; a = 0 leaves only the linear term
        let mut gradient: Vec<f64> = (0..n)
            .map(|t| {
                if t < l {
                    self.tube - samples[t].label
                } else {
                    self.tube + samples[t - l].label
                }
            })
            .collect();

        let mut iterations = 0;
        while iterations < self.config.max_iterations {
            let Some((i, j)) = self.select_working_set(&alpha, &gradient, c, l) else {
                break;
            };
            iterations += 1;

            let q_ij = self.q(&mut cache, samples, i, j);
            let q_ii = self.q(&mut cache, samples, i, i);
            let q_jj = self.q(&mut cache, samples, j, j);
            let (old_i, old_j) = (alpha[i], alpha[j]);

            if sign(i, l) != sign(j, l) {
                let quad = positive_or_tau(q_ii + q_jj + 2.0 * q_ij);
                let delta = (-gradient[i] - gradient[j]) / quad;
                let diff = alpha[i] - alpha[j];
                alpha[i] += delta;
                alpha[j] += delta;

                if diff > 0.0 {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = diff;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = -diff;
                }
                if diff > 0.0 {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = c - diff;
                    }
                } else if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = c + diff;
                }
            } else {
                let quad = positive_or_tau(q_ii + q_jj - 2.0 * q_ij);
                let delta = (gradient[i] - gradient[j]) / quad;
                let sum = alpha[i] + alpha[j];
                alpha[i] -= delta;
                alpha[j] += delta;

                if sum > c {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = sum - c;
                    }
                } else if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = sum;
                }
                if sum > c {
                    if alpha[j] > c {
                        alpha[j] = c;
                        alpha[i] = sum - c;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = sum;
                }
            }

            let (delta_i, delta_j) = (alpha[i] - old_i, alpha[j] - old_j);
            for t in 0..n {
                let q_it = self.q(&mut cache, samples, i, t);
                let q_jt = self.q(&mut cache, samples, j, t);
                gradient[t] += q_it * delta_i + q_jt * delta_j;
            }
        }

        if iterations >= self.config.max_iterations {
            warn!("reaching max number of iterations in SVR solver");
        }

        let rho = calculate_rho(&alpha, &gradient, c, l);
        let coef = (0..l).map(|t| alpha[t] - alpha[t + l]).collect();

        debug!(
            "svr finished: #iter = {iterations}, cache hit rate = {:.2}",
            cache.stats().hit_rate()
        );

        Ok(RegressionSolution {
            coef,
            rho,
            iterations,
        })
    }

    /// Maximal violating pair, or None once the gap drops below epsilon
    fn select_working_set(
        &self,
        alpha: &[f64],
        gradient: &[f64],
        c: f64,
        l: usize,
    ) -> Option<(usize, usize)> {
        let mut gmax = f64::NEG_INFINITY;
        let mut gmax2 = f64::NEG_INFINITY;
        let mut i = None;
        let mut j = None;

        for t in 0..alpha.len() {
            let y = sign(t, l);
            let (up, low) = if y > 0.0 {
                (alpha[t] < c, alpha[t] > 0.0)
            } else {
                (alpha[t] > 0.0, alpha[t] < c)
            };
            let yg = -y * gradient[t];

            if up && yg >= gmax {
                gmax = yg;
                i = Some(t);
            }
            if low && -yg >= gmax2 {
                gmax2 = -yg;
                j = Some(t);
            }
        }

        if gmax + gmax2 < self.config.epsilon {
            return None;
        }
        i.zip(j)
    }
}

fn sign(t: usize, l: usize) -> f64 {
    if t < l {
        1.0
    } else {
        -1.0
    }
}

fn positive_or_tau(quad: f64) -> f64 {
    if quad > 0.0 {
        quad
    } else {
        TAU
    }
}

/// Mean of `y_t G_t` over free variables, else the midpoint of the feasible interval
fn calculate_rho(alpha: &[f64], gradient: &[f64], c: f64, l: usize) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut free_sum = 0.0;
    let mut free_count = 0usize;

    for t in 0..alpha.len() {
        let y = sign(t, l);
        let yg = y * gradient[t];

        if alpha[t] >= c {
            if y < 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if y > 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            free_count += 1;
            free_sum += yg;
        }
    }

    if free_count > 0 {
        free_sum / free_count as f64
    } else {
        (upper + lower) / 2.0
    }
}
