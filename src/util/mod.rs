//! Utility modules.

pub mod comparator;

pub use comparator::{BytewiseComparator, Comparator, FixedPrefixComparator};
