//! Training data in LibSVM text format
//!
//! `label index:value index:value ...`, one sample per line. Indices are
//! used as written, so 0 is a valid feature index.

pub mod libsvm;

pub use self::libsvm::*;
