//! FoldZip - Folder Archive Service
//!
//! HTTP service streaming every object under a photo session folder as one
//! ZIP download. Objects are fetched one at a time and written straight into
//! the response; no archive is ever staged on disk or held whole in memory.

pub mod config;
pub mod dto;
pub mod handlers;
pub mod routes;
pub mod streaming;

use std::sync::Arc;

use foldzip_domain::archive::ArchiveService;

/// Application state shared across handlers
pub struct AppState<S> {
    pub archive_service: Arc<ArchiveService<S>>,
    /// Capacity of each download's archive output channel, in chunks
    pub stream_buffer: usize,
}

impl<S> AppState<S> {
    pub fn new(service: ArchiveService<S>, stream_buffer: usize) -> Self {
        Self {
            archive_service: Arc::new(service),
            stream_buffer,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            archive_service: Arc::clone(&self.archive_service),
            stream_buffer: self.stream_buffer,
        }
    }
}
