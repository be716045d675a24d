//! Positioned cursor over the ordered files of one LSM level.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::util::Comparator;

use super::FileMetadata;

/// Cursor position within a level's file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorPos {
    /// Before the first file; stepping forward enters the first file.
    BeforeFirst,
    /// At the file with the given index.
    At(usize),
    /// Past the last file; stepping backward re-enters the last file.
    AfterLast,
}

/// An ordered cursor over one level's file-metadata records.
///
/// Files at a level (other than L0) are disjoint in key range and totally
/// ordered, so positioning is a binary search against file bounds. The
/// cursor is exhausted-sticky in the direction of travel: `next` past the
/// last file stays past it until a reposition, while `prev` from there
/// re-enters at the last file (and symmetrically at the front).
#[derive(Debug, Clone)]
pub struct LevelCursor {
    files: Arc<[Arc<FileMetadata>]>,
    pos: CursorPos,
}

impl LevelCursor {
    /// Create a cursor over an ordered list of files.
    pub fn new(files: Vec<Arc<FileMetadata>>) -> Self {
        Self {
            files: files.into(),
            pos: CursorPos::BeforeFirst,
        }
    }

    /// Number of files at the level.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the level holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The file the cursor is positioned at, if any.
    pub fn current(&self) -> Option<Arc<FileMetadata>> {
        match self.pos {
            CursorPos::At(i) => self.files.get(i).cloned(),
            _ => None,
        }
    }

    /// Position at the first file.
    pub fn first(&mut self) -> Option<Arc<FileMetadata>> {
        if self.files.is_empty() {
            self.pos = CursorPos::AfterLast;
            return None;
        }
        self.pos = CursorPos::At(0);
        self.current()
    }

    /// Position at the last file.
    pub fn last(&mut self) -> Option<Arc<FileMetadata>> {
        if self.files.is_empty() {
            self.pos = CursorPos::BeforeFirst;
            return None;
        }
        self.pos = CursorPos::At(self.files.len() - 1);
        self.current()
    }

    /// Step to the next file.
    pub fn next(&mut self) -> Option<Arc<FileMetadata>> {
        match self.pos {
            CursorPos::BeforeFirst => self.first(),
            CursorPos::At(i) => {
                if i + 1 < self.files.len() {
                    self.pos = CursorPos::At(i + 1);
                    self.current()
                } else {
                    self.pos = CursorPos::AfterLast;
                    None
                }
            }
            CursorPos::AfterLast => None,
        }
    }

    /// Step to the previous file.
    pub fn prev(&mut self) -> Option<Arc<FileMetadata>> {
        match self.pos {
            CursorPos::AfterLast => self.last(),
            CursorPos::At(i) => {
                if i > 0 {
                    self.pos = CursorPos::At(i - 1);
                    self.current()
                } else {
                    self.pos = CursorPos::BeforeFirst;
                    None
                }
            }
            CursorPos::BeforeFirst => None,
        }
    }

    /// Position at the earliest file whose largest user key is `>= key`.
    pub fn seek_ge(&mut self, cmp: &dyn Comparator, key: &[u8]) -> Option<Arc<FileMetadata>> {
        let idx = self
            .files
            .partition_point(|f| cmp.compare(f.largest_user_key(cmp), key) == Ordering::Less);
        if idx < self.files.len() {
            self.pos = CursorPos::At(idx);
            self.current()
        } else {
            self.pos = CursorPos::AfterLast;
            None
        }
    }

    /// Position at the latest file whose smallest user key is `< key`.
    pub fn seek_lt(&mut self, cmp: &dyn Comparator, key: &[u8]) -> Option<Arc<FileMetadata>> {
        let n = self
            .files
            .partition_point(|f| cmp.compare(f.smallest_user_key(cmp), key) == Ordering::Less);
        if n > 0 {
            self.pos = CursorPos::At(n - 1);
            self.current()
        } else {
            self.pos = CursorPos::BeforeFirst;
            None
        }
    }
}
