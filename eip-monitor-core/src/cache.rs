use arc_swap::ArcSwap;
use bytes::Bytes;
use std::sync::Arc;

/// Fixed-capacity snapshot of the most recently received cyclic input.
///
/// Single-writer overwrite, many-reader snapshot: the background receive path
/// stores the latest payload, the foreground loop reads it. Only the latest
/// value matters; no history is retained and stale reads are permitted.
pub struct InputCache {
    latest: ArcSwap<Bytes>,
    capacity: usize,
}

impl InputCache {
    /// Create a cache retaining the first `capacity` bytes of each payload.
    pub fn new(capacity: usize) -> Self {
        Self {
            latest: ArcSwap::from_pointee(Bytes::new()),
            capacity,
        }
    }

    /// Atomically overwrite the snapshot with the first `capacity` bytes of
    /// `payload`. Never blocks.
    pub fn write(&self, payload: &Bytes) {
        let end = payload.len().min(self.capacity);
        self.latest.store(Arc::new(payload.slice(..end)));
    }

    /// Latest snapshot; empty before the first datagram arrives. Never
    /// blocks on writers.
    pub fn read(&self) -> Bytes {
        self.latest.load().as_ref().clone()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
