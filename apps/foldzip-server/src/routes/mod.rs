//! API routes

pub mod photosession;

use axum::Router;
use foldzip_domain::ports::ObjectSource;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{handlers, AppState};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::photosession::download_handler,
        health_handler
    ),
    tags(
        (name = "download", description = "Folder archive downloads"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "FoldZip API",
        version = "0.1.0",
        description = "Streams storage folders as ZIP downloads"
    )
)]
pub struct ApiDoc;

/// Create the main application router
pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: ObjectSource + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(photosession::routes::<S>())
        .route("/health", axum::routing::get(health_handler))
        .with_state(state)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    ),
    tag = "health"
)]
async fn health_handler() -> &'static str {
    "OK"
}
