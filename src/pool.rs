//! Reusable-resource pools shared across concurrent requests.
//!
//! Neither pool ever blocks or fails: an empty pool constructs a fresh
//! instance on demand, and returns simply grow the free list.

use crate::compressor::GzipCompressor;
use crate::config::Level;
use bytes::BytesMut;
use std::collections::HashMap;
use std::sync::Mutex;

/// Pool of reusable gzip encoders, keyed by compression level.
///
/// Per-level free lists are created lazily on first acquire. Instances are
/// never shared between concurrently active responses; each response borrows
/// at most one and releases it exactly once after a clean finish.
pub(crate) struct CompressorPool {
    shards: Mutex<HashMap<Level, Vec<GzipCompressor>>>,
}

impl CompressorPool {
    pub(crate) fn new() -> Self {
        Self {
            shards: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn acquire(&self, level: Level) -> GzipCompressor {
        self.shards
            .lock()
            .expect("compressor pool poisoned")
            .entry(level)
            .or_default()
            .pop()
            .unwrap_or_else(|| GzipCompressor::new(level))
    }

    /// Returns a finished encoder to its level's free list.
    ///
    /// Encoders that did not finish cleanly must be dropped instead.
    pub(crate) fn release(&self, level: Level, mut compressor: GzipCompressor) {
        debug_assert!(compressor.is_finished());
        compressor.reset();
        self.shards
            .lock()
            .expect("compressor pool poisoned")
            .entry(level)
            .or_default()
            .push(compressor);
    }

    #[cfg(test)]
    pub(crate) fn size(&self, level: Level) -> usize {
        self.shards
            .lock()
            .unwrap()
            .get(&level)
            .map_or(0, Vec::len)
    }
}

/// Pool of reusable lookahead buffers.
///
/// Buffers come back cleared to zero length but keep their capacity.
pub(crate) struct BufferPool {
    buffers: Mutex<Vec<BytesMut>>,
    capacity: usize,
}

impl BufferPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub(crate) fn take(&self) -> BytesMut {
        self.buffers
            .lock()
            .expect("buffer pool poisoned")
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.capacity))
    }

    pub(crate) fn put(&self, mut buffer: BytesMut) {
        buffer.clear();
        self.buffers
            .lock()
            .expect("buffer pool poisoned")
            .push(buffer);
    }

    #[cfg(test)]
    pub(crate) fn size(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }
}
