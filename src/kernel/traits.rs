//! Kernel trait definition

use crate::core::SparseVector;

/// Kernel function trait
///
/// Implementations must be symmetric: `compute(x, y) == compute(y, x)`.
/// Models and solvers share kernels across threads behind an `Arc`.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64;
}
