//! Error types for model construction, training and persistence

use thiserror::Error;

/// Errors that can occur while building, training or persisting a model
#[derive(Error, Debug)]
pub enum LdaError {
    #[error("Number of topics must be positive")]
    InvalidTopicCount,

    #[error("Invalid hyperparameter: {0}")]
    InvalidParameter(String),

    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Corpus contains no documents")]
    EmptyCorpus,

    #[error("Vocabulary contains no words")]
    EmptyVocabulary,

    #[error(
        "Word index {word} at position {position} of document {document} is outside the vocabulary (size {vocab_size})"
    )]
    WordOutOfRange {
        document: usize,
        position: usize,
        word: usize,
        vocab_size: usize,
    },

    #[error("Cannot normalize a vector whose entries sum to {0}")]
    DivideByZero(f64),

    #[error("Newton-Raphson failed to keep alpha positive at iteration {iteration} after {backtracks} step halvings")]
    OptimizationFailed { iteration: usize, backtracks: usize },

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Id map error: {0}")]
    IdMap(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl LdaError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        LdaError::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, LdaError>;
