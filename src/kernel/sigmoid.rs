//! Sigmoid (Tanh) Kernel Implementation
//!
//! K(x, y) = tanh(γ * <x, y> + r)
//!
//! The kernel is not positive semi-definite for every parameter choice.

use crate::core::SparseVector;
use crate::kernel::linear::dot_product_sparse;
use crate::kernel::traits::Kernel;

/// Sigmoid (Hyperbolic Tangent) kernel
#[derive(Debug, Clone)]
pub struct SigmoidKernel {
    pub gamma: f64,
    pub coef0: f64,
}

impl SigmoidKernel {
    pub fn new(gamma: f64, coef0: f64) -> Self {
        Self { gamma, coef0 }
    }
}

impl Kernel for SigmoidKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (self.gamma * dot_product_sparse(x, y) + self.coef0).tanh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_kernel_value() {
        let kernel = SigmoidKernel::new(0.5, -1.0);
        let x = SparseVector::new(vec![0, 1], vec![1.0, 1.0]);
        let y = SparseVector::new(vec![0, 1], vec![2.0, 2.0]);

        assert_relative_eq!(kernel.compute(&x, &y), 1.0f64.tanh(), epsilon = 1e-12);
    }

    #[test]
    fn test_sigmoid_kernel_bounded() {
        let kernel = SigmoidKernel::new(100.0, 0.0);
        let x = SparseVector::new(vec![0], vec![5.0]);
        let value = kernel.compute(&x, &x);
        assert!(value <= 1.0 && value >= -1.0);
    }
}
