//! File metadata and per-level file positioning.

mod file_metadata;
mod level_cursor;

pub use file_metadata::{FileMetadata, FileStats};
pub use level_cursor::LevelCursor;
