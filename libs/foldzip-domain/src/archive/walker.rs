//! Prefix walker
//!
//! Enumerates every leaf object under a walk root by expanding common
//! prefixes. The frontier is an explicit FIFO of pending prefixes instead of
//! recursion, so hierarchy depth never grows the call stack.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::archive::{AbortToken, Result, StorageKey, WalkRoot, DELIMITER};
use crate::ports::ObjectSource;

/// Lazy sequence of the leaf keys under one walk root
///
/// A prefix is listed only once every key from previous listings has been
/// handed out. Keys are neither sorted nor deduplicated. Each listing call
/// goes through the abort token.
pub struct PrefixWalker<'a, S> {
    source: &'a S,
    abort: &'a AbortToken,
    pending: VecDeque<String>,
    ready: VecDeque<StorageKey>,
    listed: usize,
}

impl<'a, S> PrefixWalker<'a, S>
where
    S: ObjectSource,
{
    pub fn new(source: &'a S, root: &WalkRoot, abort: &'a AbortToken) -> Self {
        Self {
            source,
            abort,
            pending: VecDeque::from([root.as_str().to_string()]),
            ready: VecDeque::new(),
            listed: 0,
        }
    }

    /// Number of prefixes listed so far
    pub fn listed_prefixes(&self) -> usize {
        self.listed
    }

    /// Next leaf key, or `None` once the walk is exhausted
    ///
    /// # Errors
    ///
    /// Listing failures propagate unchanged; `ArchiveError::Aborted` once the
    /// token is aborted.
    pub async fn next_key(&mut self) -> Result<Option<StorageKey>> {
        loop {
            if let Some(key) = self.ready.pop_front() {
                return Ok(Some(key));
            }

            let Some(prefix) = self.pending.pop_front() else {
                return Ok(None);
            };

            let listing = self.abort.run(self.source.list(&prefix, DELIMITER)).await?;
            self.listed += 1;

            debug!(
                prefix = %prefix,
                objects = listing.objects.len(),
                folders = listing.common_prefixes.len(),
                "Listed prefix"
            );

            self.ready.extend(
                listing
                    .objects
                    .into_iter()
                    .filter(|key| !key.is_folder_marker()),
            );

            for child in listing.common_prefixes {
                if child == prefix || !child.starts_with(prefix.as_str()) {
                    warn!(prefix = %prefix, child = %child, "Ignoring common prefix that does not descend");
                    continue;
                }
                debug!(folder = %child, "Queueing subfolder");
                self.pending.push_back(child);
            }
        }
    }

    /// Drain the walk into a vector
    pub async fn collect_keys(mut self) -> Result<Vec<StorageKey>> {
        let mut keys = Vec::new();
        while let Some(key) = self.next_key().await? {
            keys.push(key);
        }
        Ok(keys)
    }
}
