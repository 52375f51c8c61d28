//! In-process bridge to a libsvm-style toolkit
//!
//! Runs train, scale and predict from command strings without spawning a
//! process. Prediction reads its sample from a memory buffer instead of a
//! test file. The SMO-based engine follows "Making Large-Scale SVM Learning
//! Practical" by Thorsten Joachims.

pub mod api;
pub mod cache;
pub mod command;
pub mod core;
pub mod data;
pub mod kernel;
pub mod model;
pub mod optimizer;
pub mod redirect;
pub mod scaling;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{predict, scale, train};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::command::{tokenize, ArgumentVector};
pub use crate::core::error::{Result, SVMError};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::LibSVMDataset;
pub use crate::kernel::{Kernel, KernelType, LinearKernel};
pub use crate::model::{load_model, save_model, SvmModel, SvmType, TrainParams};
pub use crate::optimizer::{DecisionFunction, SVMOptimizer};
pub use crate::redirect::RedirectGuard;
pub use crate::scaling::{ScaleOptions, ScalingParams};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
