//! Domain entities for folder archiving
//!
//! Storage keys, the walk root that bounds one download, the lifecycle state
//! of an archive stream, and the values exchanged with the object source.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};

use crate::archive::error::{ArchiveError, Result};

/// Hierarchical delimiter used by the object store
pub const DELIMITER: char = '/';

/// Opaque hierarchical path identifying one stored object
///
/// A key ending with the delimiter is a folder marker, not a real object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this key is a virtual folder marker
    pub fn is_folder_marker(&self) -> bool {
        self.0.ends_with(DELIMITER)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for StorageKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for StorageKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Storage prefix bounding one download
///
/// Fixed for the duration of a request. Archive entry names are the object
/// keys with this prefix stripped byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkRoot(String);

impl WalkRoot {
    /// Build the root for a photo session folder: `photosession/{user}/{folder}/`
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::InvalidIdentifier` when either identifier is
    /// empty, is `.` or `..`, or contains a delimiter, a backslash, a double
    /// quote or a control character.
    pub fn photosession(user_id: &str, folder_id: &str) -> Result<Self> {
        validate_identifier("user", user_id)?;
        validate_identifier("folder", folder_id)?;
        Ok(Self(format!("photosession/{user_id}/{folder_id}/")))
    }

    /// Use an arbitrary prefix as root
    pub fn from_prefix(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compute the archive-relative path of a key under this root
    ///
    /// # Errors
    ///
    /// A key that does not start with the root is a logic fault and yields
    /// `ArchiveError::KeyOutsideRoot`.
    pub fn relative_path<'k>(&self, key: &'k StorageKey) -> Result<&'k str> {
        key.as_str()
            .strip_prefix(self.0.as_str())
            .ok_or_else(|| ArchiveError::KeyOutsideRoot {
                key: key.to_string(),
                root: self.0.clone(),
            })
    }
}

impl fmt::Display for WalkRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_identifier(kind: &'static str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value
            .chars()
            .any(|c| c == DELIMITER || c == '\\' || c == '"' || c.is_control());

    if invalid {
        return Err(ArchiveError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Lifecycle of an archive stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    /// Accepting appends
    Open,
    /// Sealed with a complete footer
    Finalized,
    /// Torn down without a footer
    Aborted,
}

impl ArchiveState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Finalized => "finalized",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// One level of a delimited listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Object keys directly under the listed prefix
    pub objects: Vec<StorageKey>,
    /// Immediate child folders, as full prefixes ending with the delimiter
    pub common_prefixes: Vec<String>,
}

/// Stream of content chunks for one object
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// Content of one object as handed out by the object source
pub struct ObjectContent {
    body: ChunkStream,
    size: Option<u64>,
}

impl ObjectContent {
    pub fn new(body: ChunkStream, size: Option<u64>) -> Self {
        Self { body, size }
    }

    /// Content held entirely in memory
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        let size = data.len() as u64;
        Self {
            body: stream::once(async move { Ok(data) }).boxed(),
            size: Some(size),
        }
    }

    /// Declared size, when the source knows it up front
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Content declared as zero bytes long
    pub fn is_empty(&self) -> bool {
        self.size == Some(0)
    }

    pub fn into_body(self) -> ChunkStream {
        self.body
    }
}

impl fmt::Debug for ObjectContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectContent")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Outcome of one successful aggregation
#[derive(Debug, Clone)]
pub struct AggregateSummary {
    /// Entries appended to the archive
    pub entries: usize,
    /// Objects skipped because their content was absent or empty
    pub skipped: usize,
    /// Content bytes written into the archive
    pub bytes: u64,
    pub started_at: DateTime<Utc>,
}

impl AggregateSummary {
    pub fn start() -> Self {
        Self {
            entries: 0,
            skipped: 0,
            bytes: 0,
            started_at: Utc::now(),
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[test]
    fn test_photosession_root_template() {
        let root = WalkRoot::photosession("u1", "f1").unwrap();
        assert_eq!(root.as_str(), "photosession/u1/f1/");
    }

    #[test]
    fn test_photosession_rejects_bad_identifiers() {
        for (user, folder) in [
            ("", "f1"),
            ("u1", ""),
            ("u1/x", "f1"),
            ("u1", ".."),
            ("u1", "a\"b"),
            ("u1", "a\\b"),
            ("u1", "a\nb"),
        ] {
            let err = WalkRoot::photosession(user, folder).unwrap_err();
            assert!(
                matches!(err, ArchiveError::InvalidIdentifier { .. }),
                "expected rejection for {user:?}/{folder:?}"
            );
        }
    }

    #[test]
    fn test_relative_path_strips_root() {
        let root = WalkRoot::photosession("u1", "f1").unwrap();
        let top = StorageKey::from("photosession/u1/f1/a.jpg");
        let nested = StorageKey::from("photosession/u1/f1/sub/deeper/b.jpg");

        assert_eq!(root.relative_path(&top).unwrap(), "a.jpg");
        assert_eq!(root.relative_path(&nested).unwrap(), "sub/deeper/b.jpg");
    }

    #[test]
    fn test_relative_path_is_byte_prefix_strip() {
        // No path normalisation: the root is removed as-is
        let root = WalkRoot::from_prefix("photosession/u1/f1/");
        let key = StorageKey::from("photosession/u1/f1/./odd//name.jpg");
        assert_eq!(root.relative_path(&key).unwrap(), "./odd//name.jpg");
    }

    #[test]
    fn test_relative_path_outside_root_is_fault() {
        let root = WalkRoot::photosession("u1", "f1").unwrap();
        let key = StorageKey::from("photosession/u2/f1/a.jpg");
        let err = root.relative_path(&key).unwrap_err();
        assert!(matches!(err, ArchiveError::KeyOutsideRoot { .. }));
    }

    #[test]
    fn test_folder_marker_detection() {
        assert!(StorageKey::from("photosession/u1/f1/sub/").is_folder_marker());
        assert!(!StorageKey::from("photosession/u1/f1/sub/a.jpg").is_folder_marker());
    }

    #[test]
    fn test_archive_state_terminal() {
        assert!(!ArchiveState::Open.is_terminal());
        assert!(ArchiveState::Finalized.is_terminal());
        assert!(ArchiveState::Aborted.is_terminal());
    }

    #[tokio::test]
    async fn test_object_content_from_bytes() {
        let content = ObjectContent::from_bytes(&b"jpeg"[..]);
        assert_eq!(content.size(), Some(4));
        assert!(!content.is_empty());

        let chunks: Vec<Bytes> = content.into_body().try_collect().await.unwrap();
        assert_eq!(chunks, vec![Bytes::from_static(b"jpeg")]);
    }

    #[test]
    fn test_empty_content() {
        assert!(ObjectContent::from_bytes(Bytes::new()).is_empty());
    }
}
