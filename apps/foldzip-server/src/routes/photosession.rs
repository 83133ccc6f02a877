//! Photo session download routes

use axum::{routing::get, Router};
use foldzip_domain::ports::ObjectSource;

use crate::{handlers::photosession::download_handler, AppState};

/// Create download routes, with and without the trailing slash
pub fn routes<S>() -> Router<AppState<S>>
where
    S: ObjectSource + 'static,
{
    Router::new()
        .route(
            "/photosession/:user_id/:folder_id/",
            get(download_handler::<S>),
        )
        .route(
            "/photosession/:user_id/:folder_id",
            get(download_handler::<S>),
        )
}
