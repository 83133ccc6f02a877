//! Ports (trait definitions) for external dependencies
//!
//! The domain needs two collaborators: something that stores objects under a
//! hierarchical key space, and something that serialises entries into one
//! archive stream. Adapters in other crates implement both.
//!
//! ## Static Dispatch
//!
//! We use native Rust async traits with `impl Future` return types instead of
//! `async_trait` so that every adapter is monomorphized into the service.

use std::future::Future;
use std::sync::Arc;

use crate::archive::{ArchiveError, ArchiveState, Listing, ObjectContent, StorageKey};

/// Port for the remote object store
///
/// Implementations hold no per-request state: one instance is shared by every
/// download running in the process.
pub trait ObjectSource: Send + Sync {
    /// List one level under `prefix`
    ///
    /// Returns the object keys directly under `prefix` and the common
    /// prefixes (child virtual folders) grouped by `delimiter`.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::Listing` if the store rejects or cannot complete
    /// the call.
    fn list(
        &self,
        prefix: &str,
        delimiter: char,
    ) -> impl Future<Output = Result<Listing, ArchiveError>> + Send;

    /// Open the content stream of an object
    ///
    /// `None` means the store answered without a body.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::Fetch` if the store rejects or cannot complete
    /// the read.
    fn get_content(
        &self,
        key: &StorageKey,
    ) -> impl Future<Output = Result<Option<ObjectContent>, ArchiveError>> + Send;
}

/// Port for the archive container being streamed to the client
///
/// ## Contract
///
/// - `append` drains the whole content stream before returning
/// - `finalize` seals the container; appending afterwards is an error
/// - `abort` is idempotent and never fails; once aborted, `append` and
///   `finalize` are no-ops
/// - `abort` after `finalize` leaves the archive finalized
pub trait ArchiveSink: Send {
    /// Append one entry, returning the number of content bytes written
    fn append(
        &mut self,
        relative_path: &str,
        content: ObjectContent,
    ) -> impl Future<Output = Result<u64, ArchiveError>> + Send;

    /// Seal the archive with its footer
    fn finalize(&mut self) -> impl Future<Output = Result<(), ArchiveError>> + Send;

    /// Tear the archive down without a footer
    fn abort(&mut self);

    /// Current lifecycle state
    fn state(&self) -> ArchiveState;
}

impl<T> ObjectSource for Arc<T>
where
    T: ObjectSource,
{
    fn list(
        &self,
        prefix: &str,
        delimiter: char,
    ) -> impl Future<Output = Result<Listing, ArchiveError>> + Send {
        (**self).list(prefix, delimiter)
    }

    fn get_content(
        &self,
        key: &StorageKey,
    ) -> impl Future<Output = Result<Option<ObjectContent>, ArchiveError>> + Send {
        (**self).get_content(key)
    }
}
