use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("invalid document: {message}")]
    InvalidDocument { message: String },
    #[error("invalid filter format: {message}")]
    InvalidFilter { message: String },
    #[error("invalid limit format: `{value}`")]
    InvalidLimit { value: String },
    #[error("access denied for `{login}`")]
    AccessDenied { login: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    pub fn invalid_limit(value: impl Into<String>) -> Self {
        Self::InvalidLimit {
            value: value.into(),
        }
    }

    pub fn access_denied(login: impl Into<String>) -> Self {
        Self::AccessDenied {
            login: login.into(),
        }
    }
}
