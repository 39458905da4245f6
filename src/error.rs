use polars::prelude::PolarsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForecastError>;

/// Every way a forecasting run can fail. Nothing here is retried internally.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Insufficient history: need at least {required} observations, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("Data leak detected: {total} observations split into {train} training + {validation} validation")]
    DataLeakDetected {
        total: usize,
        train: usize,
        validation: usize,
    },

    #[error("Training failed at epoch {epoch}: {reason}")]
    TrainingFailure { epoch: usize, reason: String },

    #[error("Degenerate input: actual value at index {index} is zero, MAPE is undefined")]
    DegenerateInput { index: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Checkpoint for epoch {epoch} failed: {reason}")]
    Checkpoint { epoch: usize, reason: String },

    #[error("Tensor conversion error: {0}")]
    Tensor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
