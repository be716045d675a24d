//! Range-deletion tombstone handoff between a level iterator and the
//! merging iterator above it.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::Result;

/// A range-deletion tombstone: a half-open interval of deleted user keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tombstone {
    /// Inclusive start of the deleted interval.
    pub start: Bytes,
    /// Exclusive end of the deleted interval.
    pub end: Bytes,
    /// Sequence number at which the deletion was written.
    pub sequence: u64,
}

impl Tombstone {
    /// Create a tombstone covering `[start, end)` at `sequence`.
    pub fn new(start: impl Into<Bytes>, end: impl Into<Bytes>, sequence: u64) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            sequence,
        }
    }
}

/// A stream of range-deletion tombstones from one sstable, sorted by start
/// key.
///
/// The level iterator never consumes the stream itself; it hands the
/// iterator to the merging iterator through a [`RangeDelSlot`] and closes it
/// when the file is retired.
pub trait RangeDelIterator: Send {
    /// Position at the first tombstone.
    fn first(&mut self) -> Option<Tombstone>;

    /// Step to the next tombstone.
    fn next(&mut self) -> Option<Tombstone>;

    /// Release the iterator's resources. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Shared handle to an open range-deletion iterator.
pub type RangeDelHandle = Arc<Mutex<Box<dyn RangeDelIterator>>>;

/// The tombstone outparam cell shared between a level iterator and the
/// merging iterator.
///
/// Discipline: the level iterator is the sole writer, the merging iterator
/// the sole reader. The slot holds the currently open file's tombstone
/// iterator and is empty whenever no file with a registered tombstone
/// stream is logically open. The level iterator keeps a private copy of the
/// handle so a bounds-induced logical close (which must empty the slot) can
/// restore it on re-entry without reopening the file.
#[derive(Clone, Default)]
pub struct RangeDelSlot {
    inner: Arc<Mutex<Option<RangeDelHandle>>>,
}

impl RangeDelSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the current handle, if any.
    pub fn get(&self) -> Option<RangeDelHandle> {
        self.inner.lock().clone()
    }

    /// Replace the slot's contents.
    pub fn set(&self, handle: Option<RangeDelHandle>) {
        *self.inner.lock() = handle;
    }

    /// Empty the slot.
    pub fn clear(&self) {
        *self.inner.lock() = None;
    }

    /// Whether the slot currently holds a handle.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl std::fmt::Debug for RangeDelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeDelSlot")
            .field("occupied", &!self.is_empty())
            .finish()
    }
}
