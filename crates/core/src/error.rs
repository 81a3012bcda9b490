use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, serializable classification of an evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameters,
    SplitExecutionFailure,
    AggregateFailure,
    HashFetchFailure,
    Collaborator,
}

impl ErrorKind {
    /// Wire name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameters => "invalid_parameters",
            Self::SplitExecutionFailure => "split_execution_failure",
            Self::AggregateFailure => "aggregate_failure",
            Self::HashFetchFailure => "hash_fetch_failure",
            Self::Collaborator => "collaborator",
        }
    }
}

/// Failure recorded against a single split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitError {
    pub split_index: usize,
    pub kind: ErrorKind,
    pub message: String,
}

impl SplitError {
    #[must_use]
    pub fn execution(split_index: usize, message: impl Into<String>) -> Self {
        Self {
            split_index,
            kind: ErrorKind::SplitExecutionFailure,
            message: message.into(),
        }
    }
}

/// Errors surfaced by walk-forward runs and leaderboard builds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Window, stride, cost or date-range parameters were rejected before any split was generated.
    #[error("invalid parameters: {message}")]
    InvalidParameters { message: String },

    /// A single split's backtest call errored or timed out.
    #[error("split {split_index} failed: {message}")]
    SplitExecutionFailure { split_index: usize, message: String },

    /// No split of the run succeeded.
    #[error("walk-forward run failed: 0 of {} splits succeeded", failures.len())]
    AggregateFailure { failures: Vec<SplitError> },

    /// The current feature fingerprint for a model could not be fetched.
    #[error("feature hash lookup for {model_id} failed: {message}")]
    HashFetchFailure { model_id: String, message: String },

    /// A listing collaborator (model registry, ticker universe) failed.
    #[error("collaborator error: {message}")]
    Collaborator { message: String },
}

impl EvalError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    pub fn collaborator(err: &anyhow::Error) -> Self {
        Self::Collaborator {
            message: format!("{err:#}"),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameters { .. } => ErrorKind::InvalidParameters,
            Self::SplitExecutionFailure { .. } => ErrorKind::SplitExecutionFailure,
            Self::AggregateFailure { .. } => ErrorKind::AggregateFailure,
            Self::HashFetchFailure { .. } => ErrorKind::HashFetchFailure,
            Self::Collaborator { .. } => ErrorKind::Collaborator,
        }
    }

    /// Offending split index, where one applies.
    #[must_use]
    pub const fn split_index(&self) -> Option<usize> {
        match self {
            Self::SplitExecutionFailure { split_index, .. } => Some(*split_index),
            _ => None,
        }
    }
}

impl From<&SplitError> for EvalError {
    fn from(err: &SplitError) -> Self {
        Self::SplitExecutionFailure {
            split_index: err.split_index,
            message: err.message.clone(),
        }
    }
}
