//! # levelscan
//!
//! The level iterator of an LSM-tree storage engine: a single logical
//! ordered stream of point keys drawn from the disjoint, key-ordered
//! sstables of one level.
//!
//! ## Features
//!
//! - **Lazy file selection**: sstables are located by metadata and opened
//!   on demand through a pluggable [`TableOpener`]
//! - **Bound enforcement**: per-file effective bounds, elided when a file's
//!   own extremes already enforce them
//! - **Tombstone handoff**: per-file range-deletion iterators are published
//!   to a consuming merge through a shared [`RangeDelSlot`], with synthetic
//!   boundary pauses so the merge never advances off live tombstones
//! - **Prefix seeks**: bloom-filter friendly early exit when a prefix
//!   cannot appear in any later file
//! - **Lazy combined iteration**: crossing a range-key-bearing file arms a
//!   shared trigger for the enclosing iterator
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use levelscan::{
//!     BytewiseComparator, InternalIterator, IterOptions, LevelCursor,
//!     LevelIterator, ScanContext, SeekFlags,
//! };
//!
//! let mut iter = LevelIterator::new(
//!     ScanContext::background(),
//!     IterOptions::default(),
//!     comparator,
//!     opener,
//!     LevelCursor::new(files),
//!     level,
//! );
//! while let Some(kv) = iter.next() {
//!     // ...
//! }
//! iter.close()?;
//! ```

// Public modules
pub mod error;
pub mod options;
pub mod types;

// Internal modules
mod iterator;
mod util;
mod version;

// Re-export main types for convenience
pub use error::{first_error, Error, Result};
pub use options::{BlockPropertyFilter, IterOptions, ScanContext, TableFilter};
pub use types::{InternalKV, InternalKey, ValueType};

// Comparators
pub use util::{BytewiseComparator, Comparator, FixedPrefixComparator};

// File metadata and level positioning
pub use version::{FileMetadata, FileStats, LevelCursor};

// Iterators
pub use iterator::{
    new_combined_state, CombinedIterState, InternalIterator, IterSet, IteratorKinds,
    LevelIterStats, LevelIterator, RangeDelHandle, RangeDelIterator, RangeDelSlot, SeekFlags,
    SharedCombinedState, TableIterOptions, TableOpener, Tombstone,
};
