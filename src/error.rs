use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("no feasible portfolio found under regime '{regime}'")]
    NoFeasiblePortfolio { regime: String },

    #[error("unknown regime: {0}")]
    UnknownRegime(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid config: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl FrontierError {
    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
