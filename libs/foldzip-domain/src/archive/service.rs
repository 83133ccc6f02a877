//! Archive service - Aggregation orchestration
//!
//! Drives the prefix walker over a walk root and feeds every discovered
//! object into an archive sink, one object at a time.

use tracing::{debug, info, instrument};

use super::{AbortToken, AggregateSummary, PrefixWalker, Result, WalkRoot};
use crate::ports::{ArchiveSink, ObjectSource};

/// Service building folder archives from an object source
///
/// Holds only the shared, stateless object source. Every call to
/// [`ArchiveService::aggregate`] is independent, so one service instance
/// serves any number of concurrent downloads.
///
/// ## Ordering
///
/// Within one aggregation, work is strictly sequential: list a prefix, then
/// for each leaf fetch and append before touching the next one. At most one
/// object body is in flight per download.
pub struct ArchiveService<S> {
    source: S,
}

impl<S> ArchiveService<S>
where
    S: ObjectSource,
{
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Append every object under `root` to `archive`, then finalize it
    ///
    /// Entry names are the object keys with `root` stripped. Objects whose
    /// content is absent or declared empty are skipped.
    ///
    /// # Errors
    ///
    /// Any listing, fetch or append failure ends the aggregation immediately
    /// and the archive is left unfinalized; the caller is expected to abort
    /// it. `ArchiveError::Aborted` is returned when `abort` fires.
    #[instrument(skip_all, fields(root = %root))]
    pub async fn aggregate<A>(
        &self,
        root: &WalkRoot,
        archive: &mut A,
        abort: &AbortToken,
    ) -> Result<AggregateSummary>
    where
        A: ArchiveSink,
    {
        let mut summary = AggregateSummary::start();
        let mut walker = PrefixWalker::new(&self.source, root, abort);

        while let Some(key) = walker.next_key().await? {
            let relative = root.relative_path(&key)?;

            let content = abort.run(self.source.get_content(&key)).await?;
            let Some(content) = content.filter(|c| !c.is_empty()) else {
                debug!(key = %key, "Skipping object without content");
                summary.skipped += 1;
                continue;
            };

            debug!(key = %key, entry = %relative, "Adding file to archive");
            summary.bytes += abort.run(archive.append(relative, content)).await?;
            summary.entries += 1;
        }

        abort.run(archive.finalize()).await?;

        info!(
            entries = summary.entries,
            skipped = summary.skipped,
            bytes = summary.bytes,
            folders = walker.listed_prefixes(),
            "Archive aggregation complete"
        );
        Ok(summary)
    }
}
