use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("CONTRACT_VIOLATION: {0}")]
    Contract(String),
    #[error("REGISTRY_INVALID: {0}")]
    Registry(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("SOURCE_FAILURE: {0}")]
    Source(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Contract(_) | Self::Registry(_) | Self::Internal(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(value: base64::DecodeError) -> Self {
        Self::Registry(format!("undecodable fingerprint: {}", value))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
