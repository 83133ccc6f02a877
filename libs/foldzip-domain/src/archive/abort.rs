//! Per-request cancellation context
//!
//! One `AbortToken` is created for each download and cloned into every stage
//! of the pipeline. Suspend points run through [`AbortToken::run`], which
//! refuses to start work once the token is aborted and drops the in-flight
//! future as soon as an abort arrives.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::archive::error::{ArchiveError, Result};

/// Cloneable abort signal shared by all stages of one download
#[derive(Debug, Clone)]
pub struct AbortToken {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal abort to every holder of this token
    ///
    /// Idempotent. Returns `true` only for the call that flipped the token.
    pub fn abort(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Fail with `ArchiveError::Aborted` if the token was aborted
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_aborted() {
            return Err(ArchiveError::Aborted);
        }
        Ok(())
    }

    /// Resolve once the token is aborted
    pub async fn aborted(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on abort
        let _ = rx.wait_for(|aborted| *aborted).await;
    }

    /// Run a suspend point unless, or until, the token is aborted
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.ensure_active()?;

        tokio::select! {
            biased;
            _ = self.aborted() => Err(ArchiveError::Aborted),
            result = fut => result,
        }
    }
}

impl Default for AbortToken {
    fn default() -> Self {
        Self::new()
    }
}
