//! Instrumented in-memory implementations of the ports
//!
//! Used by the unit tests of this crate and, through the `testing` feature,
//! by the integration tests of the adapters and the HTTP service.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::archive::{
    AbortToken, ArchiveError, ArchiveState, Listing, ObjectContent, StorageKey,
};
use crate::ports::{ArchiveSink, ObjectSource};

/// Object source backed by a sorted map, with call counters and fault injection
#[derive(Debug, Default)]
pub struct InMemoryObjectSource {
    objects: BTreeMap<String, Bytes>,
    absent: HashSet<String>,
    failing_prefix: Option<String>,
    failing_fetch: Option<usize>,
    failing_body: Option<String>,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl InMemoryObjectSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects<K, V>(objects: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Bytes>,
    {
        let mut source = Self::new();
        for (key, data) in objects {
            source.objects.insert(key.into(), data.into());
        }
        source
    }

    /// Answer `get_content` for `key` without a body
    pub fn absent(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.objects.entry(key.clone()).or_default();
        self.absent.insert(key);
        self
    }

    /// Fail the listing of exactly this prefix
    pub fn fail_listing(mut self, prefix: impl Into<String>) -> Self {
        self.failing_prefix = Some(prefix.into());
        self
    }

    /// Fail the nth `get_content` call (1-based)
    pub fn fail_fetch_at(mut self, nth: usize) -> Self {
        self.failing_fetch = Some(nth);
        self
    }

    /// Serve the first chunk of `key`, then fail its body stream
    pub fn fail_body_of(mut self, key: impl Into<String>) -> Self {
        self.failing_body = Some(key.into());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Keys passed to `get_content`, in call order
    pub fn fetched_keys(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl ObjectSource for InMemoryObjectSource {
    async fn list(&self, prefix: &str, delimiter: char) -> Result<Listing, ArchiveError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_prefix.as_deref() == Some(prefix) {
            return Err(ArchiveError::listing(prefix, "injected listing failure"));
        }

        let mut objects = Vec::new();
        let mut folders = BTreeSet::new();
        for key in self.objects.keys().filter(|k| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match rest.find(delimiter) {
                Some(idx) => {
                    let end = prefix.len() + idx + delimiter.len_utf8();
                    folders.insert(key[..end].to_string());
                }
                None => objects.push(StorageKey::from(key.as_str())),
            }
        }

        Ok(Listing {
            objects,
            common_prefixes: folders.into_iter().collect(),
        })
    }

    async fn get_content(&self, key: &StorageKey) -> Result<Option<ObjectContent>, ArchiveError> {
        let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.fetched.lock().unwrap().push(key.to_string());

        if self.failing_fetch == Some(call) {
            return Err(ArchiveError::fetch(key.as_str(), "injected fetch failure"));
        }
        if self.absent.contains(key.as_str()) {
            return Ok(None);
        }

        let data = self
            .objects
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| ArchiveError::fetch(key.as_str(), "NoSuchKey"))?;

        if self.failing_body.as_deref() == Some(key.as_str()) {
            let failing_key = key.to_string();
            let chunks = vec![
                Ok(data.slice(..data.len().min(1))),
                Err(ArchiveError::fetch(failing_key, "connection reset mid-body")),
            ];
            return Ok(Some(ObjectContent::new(
                stream::iter(chunks).boxed(),
                Some(data.len() as u64),
            )));
        }

        Ok(Some(ObjectContent::from_bytes(data)))
    }
}

/// Observable operation on a [`RecordingArchive`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEvent {
    Append { path: String, bytes: u64 },
    Finalize,
    Abort,
}

/// Archive sink that records every operation instead of encoding anything
#[derive(Debug)]
pub struct RecordingArchive {
    events: Arc<Mutex<Vec<ArchiveEvent>>>,
    state: ArchiveState,
    appended: usize,
    abort_after: Option<(usize, AbortToken)>,
}

impl RecordingArchive {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            state: ArchiveState::Open,
            appended: 0,
            abort_after: None,
        }
    }

    /// Abort `token` right after the nth append returns, like a client
    /// disconnecting mid-stream
    pub fn abort_token_after(mut self, appends: usize, token: AbortToken) -> Self {
        self.abort_after = Some((appends, token));
        self
    }

    pub fn events(&self) -> Vec<ArchiveEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Paths of the appended entries, in append order
    pub fn appended_paths(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ArchiveEvent::Append { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ArchiveEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Default for RecordingArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveSink for RecordingArchive {
    async fn append(
        &mut self,
        relative_path: &str,
        content: ObjectContent,
    ) -> Result<u64, ArchiveError> {
        match self.state {
            ArchiveState::Aborted => return Ok(0),
            ArchiveState::Finalized => {
                return Err(ArchiveError::archive_write("archive already finalized"))
            }
            ArchiveState::Open => {}
        }

        let mut body = content.into_body();
        let mut bytes = 0u64;
        while let Some(chunk) = body.try_next().await? {
            bytes += chunk.len() as u64;
        }

        self.record(ArchiveEvent::Append {
            path: relative_path.to_string(),
            bytes,
        });
        self.appended += 1;

        if let Some((after, token)) = &self.abort_after {
            if self.appended == *after {
                token.abort();
            }
        }
        Ok(bytes)
    }

    async fn finalize(&mut self) -> Result<(), ArchiveError> {
        match self.state {
            ArchiveState::Aborted => Ok(()),
            ArchiveState::Finalized => Err(ArchiveError::archive_write("archive already finalized")),
            ArchiveState::Open => {
                self.record(ArchiveEvent::Finalize);
                self.state = ArchiveState::Finalized;
                Ok(())
            }
        }
    }

    fn abort(&mut self) {
        self.record(ArchiveEvent::Abort);
        if self.state == ArchiveState::Open {
            self.state = ArchiveState::Aborted;
        }
    }

    fn state(&self) -> ArchiveState {
        self.state
    }
}
