//! Photo session download handler
//!
//! Binds one request to one archive stream: the aggregation runs on its own
//! task and writes into a bounded channel, the response body reads from it.
//! The status is decided once the first archive chunk exists, so failures
//! before that point still become a plain 500.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use foldzip_domain::{
    archive::{
        AbortToken, AggregateSummary, ArchiveError, ArchiveService, DownloadId, WalkRoot,
    },
    ports::{ArchiveSink, ObjectSource},
};
use foldzip_zip::{ArchiveOutput, ZipArchiveStream};
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    dto::photosession::PhotosessionPath,
    streaming::{archive_response, error_response, AbortOnDrop},
    AppState,
};

/// Stream a photo session folder as a ZIP download
#[utoipa::path(
    get,
    path = "/photosession/{user_id}/{folder_id}/",
    params(PhotosessionPath),
    responses(
        (status = 200, description = "Folder streamed as an uncompressed ZIP archive", body = Vec<u8>, content_type = "application/zip"),
        (status = 400, description = "Invalid user or folder identifier", body = String, content_type = "text/plain"),
        (status = 500, description = "Listing or fetching failed before streaming started", body = String, content_type = "text/plain")
    ),
    tag = "download"
)]
pub async fn download_handler<S>(
    State(state): State<AppState<S>>,
    Path(path): Path<PhotosessionPath>,
) -> Response
where
    S: ObjectSource + 'static,
{
    let download_id = DownloadId::new();
    let span = info_span!(
        "download",
        download_id = %download_id,
        user_id = %path.user_id,
        folder_id = %path.folder_id
    );

    serve_download(state, path).instrument(span).await
}

async fn serve_download<S>(state: AppState<S>, path: PhotosessionPath) -> Response
where
    S: ObjectSource + 'static,
{
    let root = match WalkRoot::photosession(&path.user_id, &path.folder_id) {
        Ok(root) => root,
        Err(err) => {
            warn!(error = %err, "Rejected download request");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };
    info!(root = %root, "Start processing folder");

    let abort = AbortToken::new();
    let mut guard = AbortOnDrop::new(abort.clone());
    let (archive, output) = ZipArchiveStream::new(state.stream_buffer);
    let ArchiveOutput { mut chunks, state: archive_state } = output;

    let task = tokio::spawn(
        run_aggregation(state.archive_service.clone(), root, archive, abort).in_current_span(),
    );

    match chunks.recv().await {
        Some(first) => archive_response(&path.folder_id, first, chunks, archive_state, guard),
        None => {
            guard.disarm();
            match task.await {
                Ok(Err(err)) => error_response(err),
                Ok(Ok(_)) => error_response("archive finished without producing data"),
                Err(join) => {
                    error!(error = %join, "Archive task failed");
                    error_response(join)
                }
            }
        }
    }
}

/// Drive one aggregation and react to its outcome
///
/// On failure the archive is aborted so the response body ends with an error
/// rather than a footer.
async fn run_aggregation<S>(
    service: Arc<ArchiveService<S>>,
    root: WalkRoot,
    mut archive: ZipArchiveStream,
    abort: AbortToken,
) -> Result<AggregateSummary, ArchiveError>
where
    S: ObjectSource,
{
    let outcome = service.aggregate(&root, &mut archive, &abort).await;

    match &outcome {
        Ok(summary) => {
            info!(
                entries = summary.entries,
                skipped = summary.skipped,
                bytes = summary.bytes,
                elapsed_ms = summary.elapsed_ms(),
                "Zip stream finished for folder"
            );
        }
        Err(err) if err.is_aborted() => {
            archive.abort();
            info!("Archive aborted before completion");
        }
        Err(err) => {
            archive.abort();
            error!(error = %err, "Error creating ZIP");
        }
    }
    outcome
}
