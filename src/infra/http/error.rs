use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docshelf_api_types::{ApiErrorBody, ApiErrorMessage};

use crate::application::error::{AppError, ErrorReport};
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

const SOURCE: &str = "infra::http::error";

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_FILTER: &str = "invalid_filter";
    pub const INVALID_LIMIT: &str = "invalid_limit";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const ACCESS_DENIED: &str = "access_denied";
    pub const FILE_STORAGE: &str = "file_storage_error";
    pub const REPO: &str = "repo_error";
    pub const INTERNAL: &str = "internal_error";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            report: None,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        let (status, code, message, hint) = match &error {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound) => (
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                "document not found",
                None,
            ),
            AppError::Domain(DomainError::InvalidFilter { .. }) => (
                StatusCode::BAD_REQUEST,
                codes::INVALID_FILTER,
                "invalid filter",
                Some(error.to_string()),
            ),
            AppError::Domain(DomainError::InvalidLimit { .. }) => (
                StatusCode::BAD_REQUEST,
                codes::INVALID_LIMIT,
                "invalid limit",
                Some(error.to_string()),
            ),
            AppError::Domain(DomainError::InvalidDocument { .. }) | AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "invalid document",
                Some(error.to_string()),
            ),
            AppError::Domain(DomainError::AccessDenied { .. }) => (
                StatusCode::FORBIDDEN,
                codes::ACCESS_DENIED,
                "access denied",
                None,
            ),
            AppError::Repo(RepoError::Integrity { message }) => (
                StatusCode::BAD_REQUEST,
                codes::INTEGRITY,
                "integrity constraint violated",
                Some(message.clone()),
            ),
            AppError::Repo(RepoError::Persistence(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "storage failure",
                None,
            ),
            AppError::Files(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::FILE_STORAGE,
                "file storage failure",
                None,
            ),
            AppError::Infra(_) | AppError::Unexpected(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::INTERNAL,
                "unexpected error occurred",
                None,
            ),
        };

        let report = ErrorReport::from_error(SOURCE, status, &error);
        Self {
            status,
            code,
            message,
            hint,
            report: Some(report),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| ErrorReport {
            source: SOURCE,
            status: self.status,
            messages: vec![format!(
                "{}: {}",
                self.code,
                self.hint.as_deref().unwrap_or(self.message)
            )],
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        // Picked up by the response logging middleware.
        report.attach(&mut response);
        response
    }
}
