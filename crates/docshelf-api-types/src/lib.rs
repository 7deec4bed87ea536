//! Request and response types for the docshelf HTTP API.
//!
//! Kept in a separate crate so clients can share the wire shapes without
//! pulling in the server.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Metadata describing one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: Uuid,
    pub name: String,
    pub mime: String,
    pub file: bool,
    pub public: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub grants: Vec<String>,
}

/// `meta` part of the multipart `POST /api/docs`; the `file` part carries content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentCreateRequest {
    pub name: String,
    pub mime: String,
    #[serde(default)]
    pub file: bool,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub grants: Vec<String>,
}

/// Query string of `GET /api/docs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentListQuery {
    pub login: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub limit: Option<String>,
}

/// Query string of `GET` and `DELETE /api/docs/{id}`.
///
/// When `login` is given the caller must be allowed to see or remove the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentAccessQuery {
    pub login: Option<String>,
}

/// Envelope for successful responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
