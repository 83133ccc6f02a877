use std::fmt;
use uuid::Uuid;

/// Unique identifier for one download request
///
/// Wraps a UUID v7 so every log line of a request can be correlated, and so
/// download IDs cannot be mixed up with other UUIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadId(Uuid);

impl DownloadId {
    /// Generate a new time-ordered DownloadId
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the inner UUID value
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DownloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DownloadId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
