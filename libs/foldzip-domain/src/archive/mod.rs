//! Archive domain module
//!
//! Everything needed to turn one storage folder into one archive stream:
//! keys and roots, the abort signal, the prefix walker and the aggregator.

mod abort;
mod entity;
mod error;
mod ids;
mod service;
mod walker;

pub use abort::AbortToken;
pub use entity::{
    AggregateSummary, ArchiveState, ChunkStream, Listing, ObjectContent, StorageKey, WalkRoot,
    DELIMITER,
};
pub use error::{ArchiveError, Result};
pub use ids::DownloadId;
pub use service::ArchiveService;
pub use walker::PrefixWalker;
