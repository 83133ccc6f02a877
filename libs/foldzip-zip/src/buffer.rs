use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};

/// Shared write target of the zip encoder
///
/// The encoder owns one handle and writes into it synchronously; the stream
/// keeps another and drains whatever was written after each operation.
#[derive(Clone, Default)]
pub(crate) struct ChunkBuffer {
    pending: Arc<Mutex<BytesMut>>,
    discard: Arc<AtomicBool>,
}

impl ChunkBuffer {
    /// Take every byte written since the last call
    pub(crate) fn take(&self) -> Bytes {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .split()
            .freeze()
    }

    /// Drop pending bytes and swallow every later write
    pub(crate) fn discard(&self) {
        self.discard.store(true, Ordering::SeqCst);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Write for ChunkBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.discard.load(Ordering::SeqCst) {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
