//! Command string tokenization

use crate::core::{Result, SVMError};

/// Placeholder occupying argv[0]; option parsers skip it
pub const PROGRAM_NAME: &str = "svmbridge";

/// Split a command string on whitespace
///
/// No quoting or escaping: every whitespace-free run is one token.
pub fn tokenize(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_owned).collect()
}

/// Owned argument vector in `(argc, argv)` convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentVector {
    args: Vec<String>,
}

impl ArgumentVector {
    /// Tokenize `command` behind the placeholder program name
    pub fn from_command(command: &str) -> Self {
        let mut args = Vec::with_capacity(command.len() / 2 + 1);
        args.push(PROGRAM_NAME.to_owned());
        args.extend(tokenize(command));
        Self { args }
    }

    /// Number of elements including the placeholder
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    /// Tokens after the placeholder
    pub fn tokens(&self) -> &[String] {
        &self.args[1..]
    }

    /// Fail with `usage` unless at least one real token follows the placeholder
    pub fn require_arguments(&self, usage: &str) -> Result<()> {
        if self.argc() < 2 {
            return Err(SVMError::Usage(usage.to_string()));
        }
        Ok(())
    }
}
