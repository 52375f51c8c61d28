//! Shrinking heuristic
//!
//! Variables that sit at a bound (0 or their C) with a multiplier estimate
//! pointing outward for `h` consecutive passes are removed from the active
//! set of the SMO loop.

use crate::core::Sample;
use std::collections::VecDeque;

/// Tracks per-variable bound history over the last `history_size` passes
#[derive(Debug)]
pub struct ShrinkingStrategy {
    lower_bound_history: Vec<VecDeque<bool>>,
    upper_bound_history: Vec<VecDeque<bool>>,
    history_size: usize,
    current_iteration: usize,
}

impl ShrinkingStrategy {
    pub fn new(n_samples: usize, history_size: usize) -> Self {
        Self {
            lower_bound_history: vec![VecDeque::with_capacity(history_size); n_samples],
            upper_bound_history: vec![VecDeque::with_capacity(history_size); n_samples],
            history_size,
            current_iteration: 0,
        }
    }

    /// Record one pass worth of bound indicators
    ///
    /// With `E_i = f(x_i) - y_i`, the multiplier estimates are
    /// `λ_lo = y_i f(x_i) - 1` and `λ_up = 1 - y_i f(x_i)`; a bound is kept
    /// when its estimate is strictly positive.
    pub fn update(&mut self, alpha: &[f64], error_cache: &[f64], samples: &[Sample], bounds: &[f64]) {
        for i in 0..samples.len() {
            let yi = samples[i].label;
            let output = error_cache[i] + yi;
            let lambda_lower = yi * output - 1.0;
            let lambda_upper = -yi * output + 1.0;

            let at_lower_bound = alpha[i] <= 1e-8 && lambda_lower > 1e-6;
            let at_upper_bound = alpha[i] >= bounds[i] - 1e-8 && lambda_upper > 1e-6;

            Self::update_history(
                &mut self.lower_bound_history[i],
                at_lower_bound,
                self.history_size,
            );
            Self::update_history(
                &mut self.upper_bound_history[i],
                at_upper_bound,
                self.history_size,
            );
        }

        self.current_iteration += 1;
    }

    fn update_history(history: &mut VecDeque<bool>, value: bool, history_size: usize) {
        if history.len() >= history_size {
            history.pop_front();
        }
        history.push_back(value);
    }

    /// Returns (indices to pin at 0, indices to pin at C)
    pub fn get_shrinkable_variables(&self) -> (Vec<usize>, Vec<usize>) {
        let consistently = |history: &VecDeque<bool>| {
            history.len() == self.history_size && history.iter().all(|&x| x)
        };

        let shrink_to_lower = (0..self.lower_bound_history.len())
            .filter(|&i| consistently(&self.lower_bound_history[i]))
            .collect();
        let shrink_to_upper = (0..self.upper_bound_history.len())
            .filter(|&i| consistently(&self.upper_bound_history[i]))
            .collect();

        (shrink_to_lower, shrink_to_upper)
    }

    pub fn has_sufficient_history(&self) -> bool {
        self.current_iteration >= self.history_size
    }
}
