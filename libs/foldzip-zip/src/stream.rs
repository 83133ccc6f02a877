//! Streaming ZIP archive sink
//!
//! Entries are encoded by `zip::ZipWriter` in non-seekable stream mode, so
//! sizes and checksums go into data descriptors after each body. Encoded
//! bytes are forwarded to an `mpsc` receiver as soon as they are produced;
//! the bounded channel provides backpressure from the client connection all
//! the way back to the object fetches.

use std::io::Write;

use bytes::Bytes;
use foldzip_domain::{
    archive::{ArchiveError, ArchiveState, ObjectContent},
    ports::ArchiveSink,
};
use futures::TryStreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use zip::{
    write::{SimpleFileOptions, StreamWriter},
    CompressionMethod, ZipWriter,
};

use crate::buffer::ChunkBuffer;

/// Entries at or above this size need ZIP64 records
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Receiving half of a [`ZipArchiveStream`]
///
/// `chunks` closes once the archive is finalized or aborted; `state` tells
/// which of the two happened.
pub struct ArchiveOutput {
    pub chunks: mpsc::Receiver<Bytes>,
    pub state: watch::Receiver<ArchiveState>,
}

/// Store-only ZIP container streamed through a bounded channel
pub struct ZipArchiveStream {
    writer: Option<ZipWriter<StreamWriter<ChunkBuffer>>>,
    buffer: ChunkBuffer,
    chunks: Option<mpsc::Sender<Bytes>>,
    state: watch::Sender<ArchiveState>,
    entries: usize,
    emitted: u64,
}

impl ZipArchiveStream {
    /// Create an open archive whose output holds at most `capacity` chunks
    pub fn new(capacity: usize) -> (Self, ArchiveOutput) {
        let buffer = ChunkBuffer::default();
        let writer = ZipWriter::new_stream(buffer.clone());
        let (chunk_tx, chunk_rx) = mpsc::channel(capacity.max(1));
        let (state_tx, state_rx) = watch::channel(ArchiveState::Open);

        let stream = Self {
            writer: Some(writer),
            buffer,
            chunks: Some(chunk_tx),
            state: state_tx,
            entries: 0,
            emitted: 0,
        };
        let output = ArchiveOutput {
            chunks: chunk_rx,
            state: state_rx,
        };
        (stream, output)
    }

    /// Entries appended so far
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Encoded bytes handed to the output so far
    pub fn bytes_emitted(&self) -> u64 {
        self.emitted
    }

    fn file_options(size: Option<u64>) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(size.map_or(true, |size| size >= ZIP64_THRESHOLD))
    }

    fn writer(&mut self) -> Result<&mut ZipWriter<StreamWriter<ChunkBuffer>>, ArchiveError> {
        self.writer
            .as_mut()
            .ok_or_else(|| ArchiveError::archive_write("zip writer already closed"))
    }

    /// Forward everything the encoder produced since the last call
    async fn emit(&mut self) -> Result<(), ArchiveError> {
        let chunk = self.buffer.take();
        if chunk.is_empty() {
            return Ok(());
        }

        let Some(chunks) = &self.chunks else {
            return Err(ArchiveError::Aborted);
        };
        let len = chunk.len() as u64;
        if chunks.send(chunk).await.is_err() {
            debug!("Archive output dropped, aborting");
            self.abort();
            return Err(ArchiveError::Aborted);
        }

        self.emitted += len;
        Ok(())
    }
}

impl ArchiveSink for ZipArchiveStream {
    async fn append(
        &mut self,
        relative_path: &str,
        content: ObjectContent,
    ) -> Result<u64, ArchiveError> {
        match self.state() {
            ArchiveState::Aborted => return Ok(0),
            ArchiveState::Finalized => {
                return Err(ArchiveError::archive_write("archive already finalized"))
            }
            ArchiveState::Open => {}
        }

        let options = Self::file_options(content.size());
        self.writer()?
            .start_file(relative_path, options)
            .map_err(|err| {
                ArchiveError::archive_write(format!("starting entry '{relative_path}': {err}"))
            })?;
        self.emit().await?;

        let mut body = content.into_body();
        let mut written = 0u64;
        while let Some(chunk) = body.try_next().await? {
            self.writer()?.write_all(&chunk).map_err(|err| {
                ArchiveError::archive_write(format!("writing entry '{relative_path}': {err}"))
            })?;
            written += chunk.len() as u64;
            self.emit().await?;
        }

        self.entries += 1;
        debug!(entry = %relative_path, bytes = written, "Entry appended");
        Ok(written)
    }

    async fn finalize(&mut self) -> Result<(), ArchiveError> {
        match self.state() {
            ArchiveState::Aborted => return Ok(()),
            ArchiveState::Finalized => {
                return Err(ArchiveError::archive_write("archive already finalized"))
            }
            ArchiveState::Open => {}
        }

        let writer = self
            .writer
            .take()
            .ok_or_else(|| ArchiveError::archive_write("zip writer already closed"))?;
        writer
            .finish()
            .map_err(|err| ArchiveError::archive_write(format!("writing central directory: {err}")))?;
        self.emit().await?;

        self.state.send_replace(ArchiveState::Finalized);
        self.chunks = None;

        info!(
            entries = self.entries,
            bytes = self.emitted,
            "Zip stream finished"
        );
        Ok(())
    }

    fn abort(&mut self) {
        if self.state().is_terminal() {
            return;
        }

        self.buffer.discard();
        self.state.send_replace(ArchiveState::Aborted);
        // The encoder writes its footer on drop; the buffer swallows it
        self.writer = None;
        self.chunks = None;

        warn!(
            entries = self.entries,
            bytes = self.emitted,
            "Zip stream aborted"
        );
    }

    fn state(&self) -> ArchiveState {
        *self.state.borrow()
    }
}

impl Drop for ZipArchiveStream {
    fn drop(&mut self) {
        self.abort();
    }
}
