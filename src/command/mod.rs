//! Command dispatchers
//!
//! Each dispatcher takes an [`ArgumentVector`], parses the option flags of
//! its command with clap and runs the matching routine. Flags follow the
//! classic svm-train / svm-predict / svm-scale tools.

pub mod argv;
pub mod predict;
pub mod scale;
pub mod train;

pub use self::argv::*;

use crate::core::SVMError;

/// Turn a clap parse failure into a usage error carrying `usage`
fn usage_error(usage: &'static str) -> impl Fn(clap::Error) -> SVMError {
    move |e| {
        let rendered = e.to_string();
        let reason = rendered.lines().next().unwrap_or_default().trim();
        SVMError::Usage(format!("{reason}\n{usage}"))
    }
}
