//! Error types for the SVM bridge

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    /// Malformed or missing command flags/arguments; carries the usage text.
    #[error("{0}")]
    Usage(String),

    #[error("can't open model file {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Model does not support probability estimates")]
    ProbabilityNotSupported,

    #[error("cannot redirect output to {}: {source}", path.display())]
    OutputRedirect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Wrong input format at line {line}")]
    InputFormat { line: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, SVMError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_problem() {
        let err = SVMError::ModelLoad {
            path: PathBuf::from("/tmp/missing.model"),
            reason: "No such file or directory".to_string(),
        };
        assert!(err.to_string().contains("can't open model file /tmp/missing.model"));

        let err = SVMError::InputFormat { line: 7 };
        assert_eq!(err.to_string(), "Wrong input format at line 7");

        assert_eq!(
            SVMError::ProbabilityNotSupported.to_string(),
            "Model does not support probability estimates"
        );
    }
}
