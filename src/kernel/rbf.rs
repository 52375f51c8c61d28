//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! where γ (gamma) controls the kernel width.

use crate::core::SparseVector;
use crate::kernel::Kernel;

/// RBF (Radial Basis Function) kernel: K(x, y) = exp(-γ * ||x - y||²)
///
/// - High gamma: close points have high influence (potential overfitting)
/// - Low gamma: distant points have influence (potential underfitting)
#[derive(Debug, Clone, Copy)]
pub struct RBFKernel {
    gamma: f64,
}

impl RBFKernel {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }
}

impl Kernel for RBFKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        let squared_distance = squared_euclidean_distance(x, y);
        (-self.gamma * squared_distance).exp()
    }
}

/// Compute squared Euclidean distance between two sparse vectors
///
/// Indices stored in only one vector contribute their squared value.
fn squared_euclidean_distance(x: &SparseVector, y: &SparseVector) -> f64 {
    let mut distance_sq = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.indices.len() && j < y.indices.len() {
        let x_idx = x.indices[i];
        let y_idx = y.indices[j];

        if x_idx == y_idx {
            let diff = x.values[i] - y.values[j];
            distance_sq += diff * diff;
            i += 1;
            j += 1;
        } else if x_idx < y_idx {
            distance_sq += x.values[i] * x.values[i];
            i += 1;
        } else {
            distance_sq += y.values[j] * y.values[j];
            j += 1;
        }
    }

    distance_sq += x.values[i..].iter().map(|v| v * v).sum::<f64>();
    distance_sq += y.values[j..].iter().map(|v| v * v).sum::<f64>();

    distance_sq
}
