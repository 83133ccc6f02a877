//! # FoldZip Domain Layer
//!
//! Pure logic for streaming a storage folder as one archive. It follows
//! hexagonal architecture principles:
//!
//! - **Entities**: storage keys, walk roots, archive lifecycle
//! - **Ports**: `ObjectSource` (the bucket) and `ArchiveSink` (the container)
//! - **Services**: the prefix walker and the archive aggregator
//!
//! ## Architecture
//!
//! This layer has NO dependencies on infrastructure concerns (AWS, zip, HTTP).
//! Adapters implement the ports in their own crates.
//!
//! ## Example
//!
//! ```rust
//! use foldzip_domain::archive::{AbortToken, ArchiveService, WalkRoot};
//! use foldzip_domain::ports::{ArchiveSink, ObjectSource};
//!
//! async fn example<S: ObjectSource, A: ArchiveSink>(service: ArchiveService<S>, mut archive: A) {
//!     let root = WalkRoot::photosession("u1", "f1").unwrap();
//!     let summary = service
//!         .aggregate(&root, &mut archive, &AbortToken::new())
//!         .await
//!         .unwrap();
//!     println!("Archived {} files", summary.entries);
//! }
//! ```

pub mod archive;
pub mod ports;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use archive::{AbortToken, ArchiveError, ArchiveService, StorageKey, WalkRoot};
pub use ports::{ArchiveSink, ObjectSource};
