//! Configuration options for levelscan.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::version::FileMetadata;

/// Number of forward steps a bounded-next seek attempts before falling back
/// to a binary search of the level's file metadata.
pub const MAX_NEXTS_BEFORE_SEEK: usize = 4;

/// Predicate deciding whether a table is relevant to a scan.
///
/// Forwarded opaquely to the table opener; the level iterator never invokes
/// it.
pub type TableFilter = Arc<dyn Fn(&FileMetadata) -> bool + Send + Sync>;

/// Opaque handle to a block-property filter.
///
/// Carried through to the table opener, which may use it to skip data blocks
/// inside an sstable. The level iterator only transports the handle.
pub trait BlockPropertyFilter: Send + Sync {
    /// The name of the property this filter applies to.
    fn name(&self) -> &str;
}

/// Options governing one iterator's view of a level.
///
/// Bounds are an inclusive lower / exclusive upper pair of user keys. The
/// filter handles are opaque and forwarded per-table to the opener.
#[derive(Clone, Default)]
pub struct IterOptions {
    /// Inclusive lower bound on user keys, if any.
    pub lower_bound: Option<Bytes>,
    /// Exclusive upper bound on user keys, if any.
    pub upper_bound: Option<Bytes>,
    /// Optional table-level relevance filter.
    pub table_filter: Option<TableFilter>,
    /// Optional block-property filter handle.
    pub block_property_filter: Option<Arc<dyn BlockPropertyFilter>>,
}

impl IterOptions {
    /// Options with the given bounds and no filters.
    pub fn with_bounds(lower: Option<Bytes>, upper: Option<Bytes>) -> Self {
        Self {
            lower_bound: lower,
            upper_bound: upper,
            ..Self::default()
        }
    }
}

impl fmt::Debug for IterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterOptions")
            .field("lower_bound", &self.lower_bound)
            .field("upper_bound", &self.upper_bound)
            .field("table_filter", &self.table_filter.is_some())
            .field(
                "block_property_filter",
                &self.block_property_filter.as_ref().map(|b| b.name()),
            )
            .finish()
    }
}

/// Per-scan context threaded through to the table opener.
///
/// Iterators are short-lived, so the context is bound at construction and
/// replaceable via `set_context`. The level iterator carries it for tracing
/// and deadline propagation but never inspects it.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    /// Deadline after which the table opener should abandon I/O.
    pub deadline: Option<Instant>,
    /// Trace identifier correlating opener work with a higher-level request.
    pub trace_id: Option<u64>,
}

impl ScanContext {
    /// A context with no deadline and no trace id.
    pub fn background() -> Self {
        Self::default()
    }
}
