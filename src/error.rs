//! Error types for the research loop.

use crate::steps::Step;
use thiserror::Error;

/// Errors that can abort a research run.
#[derive(Error, Debug)]
pub enum Error {
    /// The research topic was empty or missing
    #[error("research topic must not be empty")]
    Input,

    /// Invalid configuration (e.g. `max_loops < 1`, missing API key)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A persisted state breaks one of the state invariants
    #[error("invalid research state: {0}")]
    State(String),

    /// Finalization was requested while the router still says continue
    #[error("cannot finalize after {rounds} round(s): the router has not decided to stop")]
    NotFinished { rounds: usize },

    /// A collaborator failed; the run is aborted without retry
    #[error("round {round}: {step} failed: {source}")]
    Collaborator {
        round: usize,
        step: Step,
        #[source]
        source: CollaboratorError,
    },
}

impl Error {
    /// Round index attached to a collaborator failure.
    pub fn round(&self) -> Option<usize> {
        match self {
            Error::Collaborator { round, .. } => Some(*round),
            _ => None,
        }
    }

    /// Step attached to a collaborator failure.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::Collaborator { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Failures raised by collaborator adapters (LLM, search provider, finalizer).
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking task could not be joined
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The provider answered, but not with what the contract requires
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The collaborator returned an empty value where one is required
    #[error("empty {0}")]
    EmptyOutput(&'static str),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

/// Result type for research operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_carries_context() {
        let err = Error::Collaborator {
            round: 2,
            step: Step::Summarize,
            source: CollaboratorError::EmptyOutput("summary"),
        };

        assert_eq!(err.round(), Some(2));
        assert_eq!(err.step(), Some(Step::Summarize));
        assert_eq!(err.to_string(), "round 2: summarizer failed: empty summary");
    }

    #[test]
    fn test_input_error_has_no_round() {
        assert_eq!(Error::Input.round(), None);
        assert_eq!(Error::Input.step(), None);
    }

    #[test]
    fn test_not_finished_display() {
        let err = Error::NotFinished { rounds: 0 };
        assert_eq!(err.round(), None);
        assert_eq!(
            err.to_string(),
            "cannot finalize after 0 round(s): the router has not decided to stop"
        );
    }
}
