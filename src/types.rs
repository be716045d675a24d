//! Core key types for levelscan.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::cmp::Ordering;

/// Value type indicator in internal keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    /// Normal value.
    Value = 1,
    /// Point deletion marker (tombstone).
    Deletion = 2,
    /// Range deletion marker. Also used, with the maximum sequence
    /// number, as the exclusive boundary sentinel.
    RangeDeletion = 3,
    /// Range key set marker, bounding a file's range-key extent.
    RangeKeySet = 4,
}

impl ValueType {
    /// Create from byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(ValueType::Value),
            2 => Some(ValueType::Deletion),
            3 => Some(ValueType::RangeDeletion),
            4 => Some(ValueType::RangeKeySet),
            _ => None,
        }
    }

    /// Convert to byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Check if this is a point deletion marker.
    pub fn is_deletion(&self) -> bool {
        matches!(self, ValueType::Deletion)
    }

    /// Check if this kind marks an interval bound rather than a point
    /// record.
    pub fn is_range_kind(&self) -> bool {
        matches!(self, ValueType::RangeDeletion | ValueType::RangeKeySet)
    }
}

/// Internal key format used for iteration.
///
/// An internal key combines:
/// - User key (the key provided by the user)
/// - Sequence number (version for MVCC)
/// - Value type
///
/// Encoded format:
/// ```text
/// [user_key][packed sequence+type (8 bytes)]
/// ```
///
/// The sequence and value_type are packed into 8 bytes with sequence
/// in the high 56 bits and value_type in the low 8 bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalKey {
    /// The user-provided key.
    user_key: Bytes,
    /// Sequence number (version).
    sequence: u64,
    /// Value type.
    value_type: ValueType,
}

impl InternalKey {
    /// Maximum sequence number (56 bits).
    pub const MAX_SEQUENCE: u64 = (1 << 56) - 1;

    /// Create a new internal key.
    pub fn new(user_key: impl Into<Bytes>, sequence: u64, value_type: ValueType) -> Self {
        debug_assert!(sequence <= Self::MAX_SEQUENCE);
        Self {
            user_key: user_key.into(),
            sequence,
            value_type,
        }
    }

    /// Create an internal key for a put operation.
    pub fn for_value(user_key: impl Into<Bytes>, sequence: u64) -> Self {
        Self::new(user_key, sequence, ValueType::Value)
    }

    /// Create an internal key for a delete operation.
    pub fn for_deletion(user_key: impl Into<Bytes>, sequence: u64) -> Self {
        Self::new(user_key, sequence, ValueType::Deletion)
    }

    /// Create an exclusive range-delete sentinel for the given user key.
    ///
    /// The sentinel carries the maximum sequence number, so it sorts before
    /// every real key with the same user key. It marks an interval bound and
    /// never a real record.
    pub fn range_delete_sentinel(user_key: impl Into<Bytes>) -> Self {
        Self::new(user_key, Self::MAX_SEQUENCE, ValueType::RangeDeletion)
    }

    /// Check whether this key is an exclusive interval-bound sentinel.
    pub fn is_exclusive_sentinel(&self) -> bool {
        self.sequence == Self::MAX_SEQUENCE && self.value_type.is_range_kind()
    }

    /// Get the user key.
    pub fn user_key(&self) -> &[u8] {
        &self.user_key
    }

    /// Get a shared handle to the user key bytes.
    pub fn user_key_bytes(&self) -> Bytes {
        self.user_key.clone()
    }

    /// Get the sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Get the value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Check if this is a point deletion marker.
    pub fn is_deletion(&self) -> bool {
        self.value_type.is_deletion()
    }

    /// Encode the internal key to bytes.
    ///
    /// Format: [user_key][packed_sequence_type (8 bytes)]
    /// Where packed = (sequence << 8) | value_type
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.user_key.len() + 8);
        buf.put_slice(&self.user_key);
        let packed = (self.sequence << 8) | (self.value_type.to_byte() as u64);
        buf.put_u64(packed);
        buf.freeze()
    }

    /// Decode an internal key from bytes.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }

        let user_key_len = data.len() - 8;
        let user_key = Bytes::copy_from_slice(&data[..user_key_len]);

        let mut packed_bytes = &data[user_key_len..];
        let packed = packed_bytes.get_u64();

        let value_type = ValueType::from_byte((packed & 0xFF) as u8)?;
        let sequence = packed >> 8;

        Some(Self {
            user_key,
            sequence,
            value_type,
        })
    }

    /// Get the encoded length.
    pub fn encoded_len(&self) -> usize {
        self.user_key.len() + 8
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare user keys
        match self.user_key.cmp(&other.user_key) {
            Ordering::Equal => {
                // For same user key, newer sequence comes first (descending)
                other.sequence.cmp(&self.sequence)
            }
            ord => ord,
        }
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A key/value pair as surfaced by internal iterators.
///
/// Synthetic boundary pairs carry an exclusive range-delete sentinel key and
/// an empty value; callers must treat them as pause markers, not as records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalKV {
    /// The internal key.
    pub key: InternalKey,
    /// The value. Always empty for synthetic boundaries.
    pub value: Bytes,
}

impl InternalKV {
    /// Create a new key/value pair.
    pub fn new(key: InternalKey, value: impl Into<Bytes>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Create a synthetic boundary pair for the given user key.
    pub fn synthetic_boundary(user_key: impl Into<Bytes>) -> Self {
        Self {
            key: InternalKey::range_delete_sentinel(user_key),
            value: Bytes::new(),
        }
    }

    /// Get the user key.
    pub fn user_key(&self) -> &[u8] {
        self.key.user_key()
    }

    /// Check whether this pair is a synthetic boundary.
    pub fn is_synthetic_boundary(&self) -> bool {
        self.key.is_exclusive_sentinel() && self.value.is_empty()
    }
}
