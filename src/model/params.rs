//! Training parameters

use crate::core::{OptimizerConfig, Result, SVMError};
use crate::kernel::KernelType;
use serde::{Deserialize, Serialize};

/// Formulation of the learning problem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvmType {
    /// C-support vector classification (`-s 0`)
    #[default]
    CSvc,
    /// Epsilon-support vector regression (`-s 3`)
    EpsilonSvr,
}

impl SvmType {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::CSvc),
            3 => Ok(Self::EpsilonSvr),
            1 | 2 | 4 => Err(SVMError::InvalidParameter(format!(
                "svm type {code} is not supported (use 0 for C-SVC or 3 for epsilon-SVR)"
            ))),
            other => Err(SVMError::InvalidParameter(format!("unknown svm type {other}"))),
        }
    }

    pub fn is_classification(self) -> bool {
        matches!(self, Self::CSvc)
    }
}

/// Everything `train` needs besides the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainParams {
    pub svm_type: SvmType,
    pub kernel: KernelType,
    /// Cost of constraint violation
    pub c: f64,
    /// Stopping tolerance
    pub eps: f64,
    /// Tube width of the epsilon-insensitive loss
    pub p: f64,
    /// Kernel cache size in MB
    pub cache_size: f64,
    pub shrinking: bool,
    pub probability: bool,
    /// Per-label multipliers of C, in the order given
    pub weights: Vec<(i32, f64)>,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            kernel: KernelType::default(),
            c: 1.0,
            eps: 0.001,
            p: 0.1,
            cache_size: 100.0,
            shrinking: true,
            probability: false,
            weights: Vec::new(),
        }
    }
}

impl TrainParams {
    /// Reject parameter combinations the solvers cannot work with
    pub fn check(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SVMError::InvalidParameter(msg.to_string()));

        if let Some(gamma) = self.kernel.gamma() {
            if gamma < 0.0 {
                return invalid("gamma < 0");
            }
        }
        if let KernelType::Polynomial { degree, .. } = self.kernel {
            if degree < 0 {
                return invalid("degree of polynomial kernel < 0");
            }
        }
        if self.cache_size <= 0.0 {
            return invalid("cache_size <= 0");
        }
        if self.eps <= 0.0 {
            return invalid("eps <= 0");
        }
        if self.c <= 0.0 {
            return invalid("C <= 0");
        }
        if self.svm_type == SvmType::EpsilonSvr && self.p < 0.0 {
            return invalid("p < 0");
        }
        Ok(())
    }

    /// C multiplied by the weight given for `label`, if any
    pub fn weighted_c(&self, label: i32) -> f64 {
        self.weights
            .iter()
            .filter(|(l, _)| *l == label)
            .fold(self.c, |c, (_, w)| c * w)
    }

    /// Solver configuration for one sub-problem with the given class bounds
    pub fn optimizer_config(&self, c_positive: f64, c_negative: f64) -> OptimizerConfig {
        OptimizerConfig {
            c_positive,
            c_negative,
            epsilon: self.eps,
            cache_size: (self.cache_size * 1024.0 * 1024.0) as usize,
            shrinking: self.shrinking,
            ..OptimizerConfig::default()
        }
    }
}
