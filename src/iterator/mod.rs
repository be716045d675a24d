//! Iterator traits and shared iteration state.
//!
//! The central abstraction is [`InternalIterator`]: a positioned cursor over
//! internal key/value pairs supporting bidirectional iteration, bounded
//! scans, and prefix seeks. Sstable point iterators implement it, and
//! [`LevelIterator`] implements it on top of a whole level of sstables:
//!
//! ```text
//! merging iterator (upstream, out of crate scope)
//!     ├─→ LevelIterator (one per level)
//!     │       ├─→ LevelCursor (file selection)
//!     │       └─→ TableOpener → point iterator + range-del iterator
//!     └─→ RangeDelSlot (per-level tombstone handoff cell)
//! ```
//!
//! Positioning operations return `Option<InternalKV>`; `None` means either
//! exhaustion or failure, and callers disambiguate by probing `error()`.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::InternalKV;

mod level_iterator;
mod range_del;
mod table_opener;

pub use level_iterator::{LevelIterator, LevelIterStats};
pub use range_del::{RangeDelHandle, RangeDelIterator, RangeDelSlot, Tombstone};
pub use table_opener::{IterSet, IteratorKinds, TableIterOptions, TableOpener};

/// Hint bits a caller may attach to a seek.
///
/// `TRY_SEEK_USING_NEXT` promises the target is at or past the current
/// position, allowing a few forward steps in place of a full binary search.
/// `RELATIVE_SEEK` asks for strictly step-wise file traversal so that no
/// intermediate file's metadata goes unexamined. At most one of the two is
/// set on any given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeekFlags(u8);

impl SeekFlags {
    const TRY_SEEK_USING_NEXT: u8 = 1 << 0;
    const RELATIVE_SEEK: u8 = 1 << 1;

    /// No hints.
    pub const NONE: SeekFlags = SeekFlags(0);

    /// Whether the caller is seeking forward from the current position.
    pub fn try_seek_using_next(self) -> bool {
        self.0 & Self::TRY_SEEK_USING_NEXT != 0
    }

    /// Whether the caller requires step-wise file traversal.
    pub fn relative_seek(self) -> bool {
        self.0 & Self::RELATIVE_SEEK != 0
    }

    /// Set the seek-using-next hint.
    pub fn enable_try_seek_using_next(self) -> Self {
        SeekFlags(self.0 | Self::TRY_SEEK_USING_NEXT)
    }

    /// Clear the seek-using-next hint.
    pub fn disable_try_seek_using_next(self) -> Self {
        SeekFlags(self.0 & !Self::TRY_SEEK_USING_NEXT)
    }

    /// Set the relative-seek hint.
    pub fn enable_relative_seek(self) -> Self {
        SeekFlags(self.0 | Self::RELATIVE_SEEK)
    }

    /// Clear the relative-seek hint.
    pub fn disable_relative_seek(self) -> Self {
        SeekFlags(self.0 & !Self::RELATIVE_SEEK)
    }
}

/// A positioned iterator over internal key/value pairs.
///
/// Implementations maintain a current position; positioning operations
/// return the pair at the new position, or `None` when the iterator is
/// exhausted in the direction of travel or has failed. `error()`
/// disambiguates the two.
///
/// Bounds are an inclusive lower / exclusive upper pair of user keys.
/// `first` must not be called while a lower bound is set, nor `last` while
/// an upper bound is set; callers substitute `seek_ge(lower)` /
/// `seek_lt(upper)`.
pub trait InternalIterator: Send {
    /// Position at the first pair with user key `>= key`.
    fn seek_ge(&mut self, key: &[u8], flags: SeekFlags) -> Option<InternalKV>;

    /// Position at the first pair with user key `>= key` whose prefix
    /// equals `prefix`.
    ///
    /// `prefix` must equal the prefix portion of `key` under the
    /// comparator's split. Returning `None` only asserts that no key with
    /// this prefix and `>= key` exists in this iterator's source; it does
    /// not imply the source is exhausted.
    fn seek_prefix_ge(&mut self, prefix: &[u8], key: &[u8], flags: SeekFlags)
        -> Option<InternalKV>;

    /// Position at the last pair with user key `< key`.
    fn seek_lt(&mut self, key: &[u8], flags: SeekFlags) -> Option<InternalKV>;

    /// Position at the first pair.
    fn first(&mut self) -> Option<InternalKV>;

    /// Position at the last pair.
    fn last(&mut self) -> Option<InternalKV>;

    /// Step to the next pair.
    fn next(&mut self) -> Option<InternalKV>;

    /// Step to the first pair with user key `>= succ_key`, where `succ_key`
    /// is the caller-precomputed successor of the current prefix.
    fn next_prefix(&mut self, succ_key: &[u8]) -> Option<InternalKV>;

    /// Step to the previous pair.
    fn prev(&mut self) -> Option<InternalKV>;

    /// Replace the iteration bounds.
    fn set_bounds(&mut self, lower: Option<Bytes>, upper: Option<Bytes>);

    /// The error that caused the iterator to fail, if any.
    fn error(&self) -> Option<Error>;

    /// Release the iterator's resources. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Shared state signalling that combined point/range-key iteration should
/// be initialized.
///
/// A level iterator that crosses a file bearing range keys arms `triggered`
/// and records the extreme range-key bound it observed; the enclosing
/// iterator inspects the cell at the end of each high-level operation and,
/// once it switches modes, sets `initialized`, after which further triggers
/// are no-ops.
#[derive(Debug, Default)]
pub struct CombinedIterState {
    /// Whether combined iteration is already in effect (or will never be).
    pub initialized: bool,
    /// Whether a range-key-bearing file was crossed this operation.
    pub triggered: bool,
    /// The extreme range-key user key observed: minimal under forward
    /// iteration, maximal under reverse.
    pub key: Option<Bytes>,
}

/// Shared handle to a [`CombinedIterState`].
pub type SharedCombinedState = Arc<Mutex<CombinedIterState>>;

/// Create an unarmed combined-iteration cell.
pub fn new_combined_state() -> SharedCombinedState {
    Arc::new(Mutex::new(CombinedIterState::default()))
}
