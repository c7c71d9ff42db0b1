//! Error types for the analysis pipeline.
//!
//! Only request-level failures are errors. A candidate that fails plausibility
//! validation is dropped, and a per-trackway statistic that cannot be formed
//! becomes `None`; neither surfaces here.

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Error type for analysis operations
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Whether the whole request must be aborted rather than degraded.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisError::DataUnavailable(_))
    }
}

impl From<toml::de::Error> for AnalysisError {
    fn from(err: toml::de::Error) -> Self {
        AnalysisError::ConfigurationError(format!("Failed to parse config file: {}", err))
    }
}
