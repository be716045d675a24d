//! File metadata for SSTable files.

use std::cmp::Ordering;

use crate::types::InternalKey;
use crate::util::Comparator;

/// Table statistics relevant to iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    /// Number of range key sets in the file. Files whose range keys are all
    /// unsets or deletes surface no range keys to a reader.
    pub num_range_key_sets: u64,
}

/// Metadata about an SSTable file.
///
/// A file carries point keys (regular records and range deletions), range
/// keys, or both; the corresponding bound pairs are present only for the
/// kinds the file holds. `largest_point_key` may be an exclusive
/// range-delete sentinel when the file's point extent ends at a range
/// deletion's end rather than at a real record.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Unique file number.
    file_number: u64,
    /// File size in bytes.
    file_size: u64,
    /// Smallest point key in the file, if it has point keys.
    smallest_point_key: Option<InternalKey>,
    /// Largest point key in the file, if it has point keys.
    largest_point_key: Option<InternalKey>,
    /// Smallest range key in the file, if it has range keys.
    smallest_range_key: Option<InternalKey>,
    /// Largest range key in the file, if it has range keys.
    largest_range_key: Option<InternalKey>,
    /// Table statistics, when collected.
    stats: Option<FileStats>,
}

impl FileMetadata {
    /// Create metadata for a file holding only point keys.
    pub fn new(
        file_number: u64,
        file_size: u64,
        smallest_point_key: InternalKey,
        largest_point_key: InternalKey,
    ) -> Self {
        Self {
            file_number,
            file_size,
            smallest_point_key: Some(smallest_point_key),
            largest_point_key: Some(largest_point_key),
            smallest_range_key: None,
            largest_range_key: None,
            stats: None,
        }
    }

    /// Create metadata for a file holding only range keys.
    pub fn new_range_key_only(
        file_number: u64,
        file_size: u64,
        smallest_range_key: InternalKey,
        largest_range_key: InternalKey,
    ) -> Self {
        Self {
            file_number,
            file_size,
            smallest_point_key: None,
            largest_point_key: None,
            smallest_range_key: Some(smallest_range_key),
            largest_range_key: Some(largest_range_key),
            stats: None,
        }
    }

    /// Attach range-key bounds to point-key metadata.
    pub fn with_range_keys(mut self, smallest: InternalKey, largest: InternalKey) -> Self {
        self.smallest_range_key = Some(smallest);
        self.largest_range_key = Some(largest);
        self
    }

    /// Attach table statistics.
    pub fn with_stats(mut self, stats: FileStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Get the file number.
    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    /// Get the file size.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Whether the file contains point keys or range deletions.
    pub fn has_point_keys(&self) -> bool {
        self.smallest_point_key.is_some()
    }

    /// Whether the file contains range keys.
    pub fn has_range_keys(&self) -> bool {
        self.smallest_range_key.is_some()
    }

    /// Get the smallest point key, if the file has point keys.
    pub fn smallest_point_key(&self) -> Option<&InternalKey> {
        self.smallest_point_key.as_ref()
    }

    /// Get the largest point key, if the file has point keys.
    pub fn largest_point_key(&self) -> Option<&InternalKey> {
        self.largest_point_key.as_ref()
    }

    /// Get the smallest range key, if the file has range keys.
    pub fn smallest_range_key(&self) -> Option<&InternalKey> {
        self.smallest_range_key.as_ref()
    }

    /// Get the largest range key, if the file has range keys.
    pub fn largest_range_key(&self) -> Option<&InternalKey> {
        self.largest_range_key.as_ref()
    }

    /// Get the table statistics, when collected.
    pub fn stats(&self) -> Option<&FileStats> {
        self.stats.as_ref()
    }

    /// The file's smallest user key across point and range keys.
    pub fn smallest_user_key<'a>(&'a self, cmp: &dyn Comparator) -> &'a [u8] {
        match (&self.smallest_point_key, &self.smallest_range_key) {
            (Some(p), Some(r)) => {
                if cmp.compare(r.user_key(), p.user_key()) == Ordering::Less {
                    r.user_key()
                } else {
                    p.user_key()
                }
            }
            (Some(p), None) => p.user_key(),
            (None, Some(r)) => r.user_key(),
            (None, None) => &[],
        }
    }

    /// The file's largest user key across point and range keys.
    pub fn largest_user_key<'a>(&'a self, cmp: &dyn Comparator) -> &'a [u8] {
        match (&self.largest_point_key, &self.largest_range_key) {
            (Some(p), Some(r)) => {
                if cmp.compare(r.user_key(), p.user_key()) == Ordering::Greater {
                    r.user_key()
                } else {
                    p.user_key()
                }
            }
            (Some(p), None) => p.user_key(),
            (None, Some(r)) => r.user_key(),
            (None, None) => &[],
        }
    }
}

impl PartialEq for FileMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.file_number == other.file_number
    }
}

impl Eq for FileMetadata {}
