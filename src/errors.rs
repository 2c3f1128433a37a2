use thiserror::Error;

use crate::client::ApiError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("token not tracked: {0}")]
    NotTracked(String),

    #[error("invalid token configuration: {0}")]
    Validation(String),

    #[error("CRaaS API error: {0}")]
    Api(#[from] ApiError),

    #[error("state file error: {0}")]
    State(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, used in diagnostics and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotTracked(_) => "not_tracked",
            AppError::Validation(_) => "invalid_config",
            AppError::Api(ApiError::Transport(_)) => "transport_error",
            AppError::Api(ApiError::Status { .. }) => "api_error",
            AppError::Api(ApiError::Decode(_)) => "api_decode_error",
            AppError::Api(ApiError::InvalidEndpoint(_)) => "invalid_endpoint",
            AppError::State(_) => "state_io_error",
            AppError::Serialization(_) => "state_serialization_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}
