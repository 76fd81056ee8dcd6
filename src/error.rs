use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplorerError {
    /// Invalid parameters or mismatched model shapes.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The corpus table is missing required columns or holds malformed rows.
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// The topic model produced output the analyzers cannot use.
    #[error("Model error: {0}")]
    Model(String),

    #[error("Index out of bounds: {index} >= {max}")]
    IndexOutOfBounds {
        index: usize,
        max: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExplorerError>;

impl ExplorerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ExplorerError::Configuration(message.into())
    }
}
