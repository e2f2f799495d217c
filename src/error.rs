//! Error types for the search engine and its configuration.

use thiserror::Error;

/// Precondition violations raised by a search call.
///
/// Every variant aborts the call it came from; no partial result is kept.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search needs a time limit or a play limit")]
    NoBudget,

    #[error("engine root does not hold the requested state, re-root or drop it first")]
    RootMismatch,

    #[error("cannot select from a node that has not been expanded")]
    NotExpanded,

    #[error("node has no legal actions to select from")]
    NoLegalActions,

    #[error("selected action {action} has no child node")]
    EmptySlot { action: usize },

    #[error("game returned no successor for legal action {action}")]
    MissingSuccessor { action: usize },

    #[error("evaluator returned {actual} priors, expected {expected}")]
    InvalidPriors { expected: usize, actual: usize },

    #[error("game returned a legal action mask of length {actual}, expected {expected}")]
    InvalidActionMask { expected: usize, actual: usize },

    #[error("tree arena is full")]
    TreeFull,

    #[error("malformed tree: {0}")]
    InvalidTree(String),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors raised while loading or validating a [`SearchConfig`](crate::config::SearchConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
