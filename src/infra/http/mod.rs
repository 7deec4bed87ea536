pub mod error;
mod handlers;
mod middleware;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::get,
};

use crate::application::documents::DocumentService;

use middleware::log_responses;

#[derive(Clone)]
pub struct HttpState {
    pub documents: Arc<DocumentService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route(
            "/api/docs",
            get(handlers::list_documents).post(handlers::create_document),
        )
        .route(
            "/api/docs/{id}",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
}
