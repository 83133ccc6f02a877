//! Response side of the download pipeline
//!
//! Turns the archive output channel into an HTTP body and ties the lifetime
//! of that body to the request's abort token.

use std::io;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use foldzip_domain::archive::{AbortToken, ArchiveState};
use futures::stream::{self, Stream};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Aborts the download when dropped while still armed
///
/// Held by the handler until the first chunk arrives, then by the response
/// body. Dropping it early means the transport went away.
pub struct AbortOnDrop {
    token: AbortToken,
    armed: bool,
}

impl AbortOnDrop {
    pub fn new(token: AbortToken) -> Self {
        Self { token, armed: true }
    }

    /// The pipeline ended on its own; nothing left to cancel
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if self.armed && self.token.abort() {
            info!("Request cancelled by client, aborting archive");
        }
    }
}

/// Plain-text 500 for failures before any archive byte was sent
pub fn error_response(message: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Error creating ZIP: {message}"),
    )
        .into_response()
}

/// Successful download response streaming the archive
///
/// `first` is the chunk already pulled from `chunks` to decide on the status.
pub fn archive_response(
    folder_id: &str,
    first: Bytes,
    chunks: mpsc::Receiver<Bytes>,
    state: watch::Receiver<ArchiveState>,
    guard: AbortOnDrop,
) -> Response {
    let disposition = format!("attachment; filename=\"{folder_id}.zip\"");
    let disposition = match HeaderValue::from_str(&disposition) {
        Ok(value) => value,
        Err(err) => {
            error!(error = %err, "Invalid attachment filename");
            return error_response(err);
        }
    };

    let body = Body::from_stream(archive_body(first, chunks, state, guard));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

struct BodyState {
    first: Option<Bytes>,
    chunks: mpsc::Receiver<Bytes>,
    state: watch::Receiver<ArchiveState>,
    guard: AbortOnDrop,
    done: bool,
}

/// Chunk stream ending cleanly only when the archive was finalized
///
/// Any other ending yields an error so the connection is torn down instead
/// of presenting a truncated archive as a complete response.
fn archive_body(
    first: Bytes,
    chunks: mpsc::Receiver<Bytes>,
    state: watch::Receiver<ArchiveState>,
    guard: AbortOnDrop,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    let initial = BodyState {
        first: Some(first),
        chunks,
        state,
        guard,
        done: false,
    };

    stream::unfold(initial, |mut body| async move {
        if body.done {
            return None;
        }
        if let Some(first) = body.first.take() {
            return Some((Ok(first), body));
        }

        match body.chunks.recv().await {
            Some(chunk) => Some((Ok(chunk), body)),
            None => {
                body.done = true;
                body.guard.disarm();
                let state = *body.state.borrow();
                if state == ArchiveState::Finalized {
                    None
                } else {
                    let err = io::Error::other(format!("archive {state} before completion"));
                    Some((Err(err), body))
                }
            }
        }
    })
}
