//! Table opener: the factory turning file metadata into open iterators.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::options::{BlockPropertyFilter, IterOptions, ScanContext, TableFilter};
use crate::version::FileMetadata;

use super::range_del::RangeDelHandle;
use super::InternalIterator;

/// Which iterator kinds the caller requests from a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IteratorKinds(u8);

impl IteratorKinds {
    const POINT_BIT: u8 = 1 << 0;
    const RANGE_DELETION_BIT: u8 = 1 << 1;

    /// Point iterator only.
    pub const POINT: IteratorKinds = IteratorKinds(Self::POINT_BIT);

    /// Additionally request the file's range-deletion iterator.
    pub fn with_range_deletions(self) -> Self {
        IteratorKinds(self.0 | Self::RANGE_DELETION_BIT)
    }

    /// Whether a point iterator is requested.
    pub fn point(self) -> bool {
        self.0 & Self::POINT_BIT != 0
    }

    /// Whether a range-deletion iterator is requested.
    pub fn range_deletions(self) -> bool {
        self.0 & Self::RANGE_DELETION_BIT != 0
    }
}

/// Effective per-table iterator options.
///
/// The lower/upper bounds are the level bounds narrowed to the table: a
/// side is `None` whenever the file's own extremes make that bound
/// redundant, sparing the sstable iterator a per-key comparison. The filter
/// handles are forwarded from the level's [`IterOptions`] untouched.
#[derive(Clone, Default)]
pub struct TableIterOptions {
    /// Inclusive lower bound, when it falls inside the table.
    pub lower: Option<Bytes>,
    /// Exclusive upper bound, when it falls inside the table.
    pub upper: Option<Bytes>,
    /// Forwarded table-level relevance filter.
    pub table_filter: Option<TableFilter>,
    /// Forwarded block-property filter handle.
    pub block_property_filter: Option<Arc<dyn BlockPropertyFilter>>,
}

impl TableIterOptions {
    /// Seed per-table options with the opaque filter handles from the
    /// level's options. Bounds are filled in per loaded table.
    pub fn from_iter_options(opts: &IterOptions) -> Self {
        Self {
            lower: None,
            upper: None,
            table_filter: opts.table_filter.clone(),
            block_property_filter: opts.block_property_filter.clone(),
        }
    }
}

impl std::fmt::Debug for TableIterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableIterOptions")
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .field("table_filter", &self.table_filter.is_some())
            .field(
                "block_property_filter",
                &self.block_property_filter.as_ref().map(|b| b.name()),
            )
            .finish()
    }
}

/// The iterators produced by opening one table.
#[derive(Default)]
pub struct IterSet {
    /// The point iterator, when requested.
    pub point: Option<Box<dyn InternalIterator>>,
    /// The range-deletion iterator, when requested and the file has
    /// tombstones.
    pub range_deletion: Option<RangeDelHandle>,
}

/// Factory constructing iterators over one sstable.
///
/// Implementations typically consult a table cache and perform the I/O to
/// load index and filter blocks; the level iterator treats the produced
/// iterators as black boxes. Opening must honor the requested kinds: a
/// point iterator is mandatory when requested, while the range-deletion
/// iterator is `None` for files without tombstones.
pub trait TableOpener: Send + Sync {
    /// Open iterators over `file` with the given effective options.
    fn open(
        &self,
        ctx: &ScanContext,
        file: &Arc<FileMetadata>,
        opts: &TableIterOptions,
        kinds: IteratorKinds,
    ) -> Result<IterSet>;
}
