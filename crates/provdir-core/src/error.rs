use thiserror::Error;

/// Errors raised while constructing or loading the population model
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown utilization metric: {0}")]
    UnknownMetric(String),

    #[error("Invalid population data: {message}")]
    InvalidPopulation { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new UnknownMetric error
    pub fn unknown_metric(name: impl Into<String>) -> Self {
        Self::UnknownMetric(name.into())
    }

    /// Create a new InvalidPopulation error
    pub fn invalid_population(message: impl Into<String>) -> Self {
        Self::InvalidPopulation {
            message: message.into(),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
