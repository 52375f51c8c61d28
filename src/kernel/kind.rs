//! Runtime-selected kernel
//!
//! Models loaded from disk pick their kernel at runtime, so the persisted
//! form is an enum that dispatches to the concrete kernels.

use crate::core::{Result, SVMError, SparseVector};
use crate::kernel::{Kernel, LinearKernel, PolynomialKernel, RBFKernel, SigmoidKernel};
use serde::{Deserialize, Serialize};

/// Kernel selection with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelType {
    Linear,
    Polynomial { degree: i32, gamma: f64, coef0: f64 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl KernelType {
    /// Build from the numeric `-t` code and the shared kernel parameters
    pub fn from_code(code: i32, degree: i32, gamma: f64, coef0: f64) -> Result<Self> {
        match code {
            0 => Ok(Self::Linear),
            1 => Ok(Self::Polynomial {
                degree,
                gamma,
                coef0,
            }),
            2 => Ok(Self::Rbf { gamma }),
            3 => Ok(Self::Sigmoid { gamma, coef0 }),
            4 => Err(SVMError::InvalidParameter(
                "precomputed kernels are not supported".to_string(),
            )),
            other => Err(SVMError::InvalidParameter(format!(
                "unknown kernel type {other}"
            ))),
        }
    }

    /// Gamma, for kernels that use one
    pub fn gamma(&self) -> Option<f64> {
        match self {
            Self::Linear => None,
            Self::Polynomial { gamma, .. } | Self::Rbf { gamma } | Self::Sigmoid { gamma, .. } => {
                Some(*gamma)
            }
        }
    }

    /// Replace a zero gamma with `1 / max_index`
    pub fn with_default_gamma(self, max_index: usize) -> Self {
        if max_index == 0 || self.gamma() != Some(0.0) {
            return self;
        }
        let gamma = 1.0 / max_index as f64;
        match self {
            Self::Polynomial { degree, coef0, .. } => Self::Polynomial {
                degree,
                gamma,
                coef0,
            },
            Self::Rbf { .. } => Self::Rbf { gamma },
            Self::Sigmoid { coef0, .. } => Self::Sigmoid { gamma, coef0 },
            Self::Linear => Self::Linear,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Polynomial { .. } => "polynomial",
            Self::Rbf { .. } => "rbf",
            Self::Sigmoid { .. } => "sigmoid",
        }
    }
}

impl Default for KernelType {
    fn default() -> Self {
        Self::Rbf { gamma: 0.0 }
    }
}

impl Kernel for KernelType {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        match *self {
            Self::Linear => LinearKernel.compute(x, y),
            Self::Polynomial {
                degree,
                gamma,
                coef0,
            } => PolynomialKernel::new(degree, gamma, coef0).compute(x, y),
            Self::Rbf { gamma } => RBFKernel::new(gamma).compute(x, y),
            Self::Sigmoid { gamma, coef0 } => SigmoidKernel::new(gamma, coef0).compute(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(KernelType::from_code(0, 3, 0.5, 0.0).unwrap(), KernelType::Linear);
        assert_eq!(
            KernelType::from_code(2, 3, 0.5, 0.0).unwrap(),
            KernelType::Rbf { gamma: 0.5 }
        );
        assert!(KernelType::from_code(4, 3, 0.5, 0.0).is_err());
        assert!(KernelType::from_code(9, 3, 0.5, 0.0).is_err());
    }

    #[test]
    fn test_default_gamma_only_replaces_zero() {
        let kernel = KernelType::Rbf { gamma: 0.0 }.with_default_gamma(4);
        assert_eq!(kernel, KernelType::Rbf { gamma: 0.25 });

        let kernel = KernelType::Rbf { gamma: 2.0 }.with_default_gamma(4);
        assert_eq!(kernel, KernelType::Rbf { gamma: 2.0 });

        let kernel = KernelType::Rbf { gamma: 0.0 }.with_default_gamma(0);
        assert_eq!(kernel, KernelType::Rbf { gamma: 0.0 });
    }

    #[test]
    fn test_dispatch_matches_concrete_kernel() {
        let x = SparseVector::new(vec![0, 1], vec![1.0, 2.0]);
        let y = SparseVector::new(vec![1], vec![1.5]);

        let kind = KernelType::Sigmoid {
            gamma: 0.1,
            coef0: 0.5,
        };
        assert_eq!(kind.compute(&x, &y), SigmoidKernel::new(0.1, 0.5).compute(&x, &y));
        assert_eq!(KernelType::Linear.compute(&x, &y), 3.0);
    }

    #[test]
    fn test_serde_tagged_layout() {
        let json = serde_json::to_string(&KernelType::Rbf { gamma: 0.5 }).unwrap();
        assert_eq!(json, r#"{"type":"rbf","gamma":0.5}"#);

        let back: KernelType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, KernelType::Rbf { gamma: 0.5 });
    }
}
