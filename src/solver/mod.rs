//! SVM solver implementations
//!
//! `smo` solves the binary C-SVC dual with Sequential Minimal Optimization
//! (Platt's pair heuristics plus the shrinking of Joachims, "Making
//! Large-Scale SVM Learning Practical"). `svr` solves the epsilon-SVR dual
//! with maximal-violating-pair working set selection.

pub mod shrinking;
pub mod smo;
pub mod svr;

pub use self::shrinking::*;
pub use self::smo::*;
pub use self::svr::*;
