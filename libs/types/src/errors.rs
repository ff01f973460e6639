//! Error taxonomy and failure policy for the pipeline
//!
//! Every recoverable failure in the background jobs falls into one of three
//! classes, and each class maps to exactly one handling policy. Jobs never
//! crash the process over a single cycle's failure.

use thiserror::Error;

/// How a background job responds to a failed unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Log the failure, drop the unit, keep consuming (malformed input).
    SkipAndContinue,
    /// Log the failure, leave state untouched, retry on the next tick.
    RetryNextTick,
    /// Do not advance the checkpoint; the same unit must be re-attempted.
    BlockAdvancement,
}

/// Recoverable failures observed while consuming or aggregating.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Broker or upstream HTTP endpoint unreachable, timed out, or returned
    /// a non-success status.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A single payload could not be decoded into its expected structure.
    #[error("decode failure: {0}")]
    Decode(String),

    /// The local document store could not be written.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl PipelineError {
    /// The policy table of the pipeline: error class → handling policy.
    pub fn action(&self) -> FailureAction {
        match self {
            PipelineError::Transport(_) => FailureAction::RetryNextTick,
            PipelineError::Decode(_) => FailureAction::SkipAndContinue,
            PipelineError::Persistence(_) => FailureAction::BlockAdvancement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        assert_eq!(
            PipelineError::Transport("broker down".into()).action(),
            FailureAction::RetryNextTick
        );
        assert_eq!(
            PipelineError::Decode("bad json".into()).action(),
            FailureAction::SkipAndContinue
        );
        assert_eq!(
            PipelineError::Persistence("disk full".into()).action(),
            FailureAction::BlockAdvancement
        );
    }
}
