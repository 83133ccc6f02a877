//! # FoldZip ZIP Adapter
//!
//! Implements the `ArchiveSink` port as a ZIP container written in store mode
//! (no compression) and streamed out chunk by chunk through a bounded
//! channel. Nothing is staged on disk and at most one body chunk plus the
//! channel capacity is held in memory.

mod buffer;
mod stream;

pub use stream::{ArchiveOutput, ZipArchiveStream};
