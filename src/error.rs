//! Error types for render jobs

use thiserror::Error;

/// Result type alias for render-job operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can terminate a render job
#[derive(Error, Debug)]
pub enum Error {
    /// The page host reported a non-ignorable load failure
    #[error("Page load failed with code {code}: {description} ({url})")]
    LoadFailed {
        /// Host-reported error code (Chromium net error numbering)
        code: i32,
        /// Host-reported error description
        description: String,
        /// URL of the failed resource
        url: String,
    },

    /// The page host process crashed during the load
    #[error("Page host crashed while loading")]
    Crashed,

    /// The page never signaled load completion within the deadline
    #[error("Page did not finish loading within {0}s")]
    TimedOut(u64),

    /// The readiness condition was not met within the retry/settle budget
    #[error("Page never became ready within the {0}s readiness budget")]
    ReadinessTimeout(u64),

    /// The host capture or export call itself failed
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Failed to execute injected script in the page
    #[error("Script execution failed: {0}")]
    ScriptFailed(String),

    /// Any other error reported by the page host
    #[error("Page host error: {0}")]
    Host(String),
}
