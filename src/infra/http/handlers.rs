//! Document handlers

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use docshelf_api_types::{
    DataResponse, DocumentAccessQuery, DocumentCreateRequest, DocumentListQuery, DocumentMeta,
};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::domain::documents::DocumentFilter;
use crate::domain::entities::{DocumentRecord, NewDocument};

use super::HttpState;
use super::error::ApiError;

pub async fn list_documents(
    State(state): State<HttpState>,
    Query(query): Query<DocumentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = DocumentFilter::parse(
        query.login.as_deref(),
        query.key.as_deref(),
        query.value.as_deref(),
        query.limit.as_deref(),
    )
    .map_err(AppError::from)?;

    let documents = state.documents.list_documents(&filter).await?;
    let data: Vec<DocumentMeta> = documents.into_iter().map(document_to_api).collect();

    Ok(Json(DataResponse::new(data)))
}

pub async fn get_document(
    State(state): State<HttpState>,
    id: Result<Path<Uuid>, PathRejection>,
    Query(access): Query<DocumentAccessQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::not_found("document not found"))?;
    let document = match caller(&access) {
        Some(login) => state.documents.get_document_as(id, login).await?,
        None => state.documents.get_document(id).await?,
    };

    Ok(Json(DataResponse::new(document_to_api(document))))
}

pub async fn create_document(
    State(state): State<HttpState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart
        .map_err(|err| ApiError::bad_request("invalid multipart body", Some(err.body_text())))?;
    let CreatePayload { meta, content } = read_create_payload(&mut multipart).await?;

    let new = NewDocument {
        name: meta.name,
        mime: meta.mime,
        file: meta.file,
        public: meta.public,
        grants: meta.grants,
        content,
    };
    let document = state.documents.add_document(new).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(document_to_api(document))),
    ))
}

pub async fn delete_document(
    State(state): State<HttpState>,
    id: Result<Path<Uuid>, PathRejection>,
    Query(access): Query<DocumentAccessQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::not_found("document not found"))?;
    match caller(&access) {
        Some(login) => state.documents.remove_document_as(id, login).await?,
        None => state.documents.remove_document(id).await?,
    };

    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

struct CreatePayload {
    meta: DocumentCreateRequest,
    content: Option<Vec<u8>>,
}

/// Reads the `meta` JSON part and the optional `file` part; other parts are ignored.
async fn read_create_payload(multipart: &mut Multipart) -> Result<CreatePayload, ApiError> {
    let mut meta = None;
    let mut content = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request("invalid multipart body", Some(err.body_text())))?
    {
        match field.name() {
            Some("meta") => {
                let text = field.text().await.map_err(|err| {
                    ApiError::bad_request("invalid multipart body", Some(err.body_text()))
                })?;
                let parsed = serde_json::from_str::<DocumentCreateRequest>(&text)
                    .map_err(|err| ApiError::bad_request("invalid json", Some(err.to_string())))?;
                meta = Some(parsed);
            }
            Some("file") => {
                let bytes = field.bytes().await.map_err(|err| {
                    ApiError::bad_request("invalid multipart body", Some(err.body_text()))
                })?;
                content = Some(bytes.to_vec());
            }
            _ => continue,
        }
    }

    let meta = meta.ok_or_else(|| {
        ApiError::bad_request("missing meta part", Some("expected a `meta` JSON part".into()))
    })?;
    Ok(CreatePayload { meta, content })
}

/// Login the request acts for, if any.
fn caller(access: &DocumentAccessQuery) -> Option<&str> {
    access
        .login
        .as_deref()
        .map(str::trim)
        .filter(|login| !login.is_empty())
}

fn document_to_api(document: DocumentRecord) -> DocumentMeta {
    DocumentMeta {
        id: document.id,
        name: document.name,
        mime: document.mime,
        file: document.file,
        public: document.public,
        created_at: document.created_at,
        grants: document.grants,
    }
}
