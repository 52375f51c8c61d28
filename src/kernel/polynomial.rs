//! Polynomial Kernel Implementation
//!
//! K(x, y) = (γ * <x, y> + r)^d
//!
//! Where:
//! - γ (gamma): scaling factor for the dot product
//! - r (coef0): independent term in the polynomial
//! - d (degree): degree of the polynomial

use crate::core::SparseVector;
use crate::kernel::linear::dot_product_sparse;
use crate::kernel::traits::Kernel;

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone)]
pub struct PolynomialKernel {
    pub gamma: f64,
    pub coef0: f64,
    pub degree: i32,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel
    ///
    /// # Examples
    /// ```
    /// use svmbridge::kernel::PolynomialKernel;
    ///
    /// // Quadratic kernel: (x·y + 1)²
    /// let quad_kernel = PolynomialKernel::new(2, 1.0, 1.0);
    /// assert_eq!(quad_kernel.degree, 2);
    /// ```
    pub fn new(degree: i32, gamma: f64, coef0: f64) -> Self {
        Self {
            gamma,
            coef0,
            degree,
        }
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (self.gamma * dot_product_sparse(x, y) + self.coef0).powi(self.degree)
    }
}
