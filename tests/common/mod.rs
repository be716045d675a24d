//! Shared in-memory fixtures for level iterator tests.
//!
//! Tables are plain sorted vectors behind the `TableOpener` seam, with
//! counters recording opens and closes so tests can assert on the
//! iterator's file lifecycle.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use levelscan::{
    Comparator, Error, FileMetadata, FileStats, InternalIterator, InternalKV, InternalKey,
    IterOptions, IterSet, IteratorKinds, LevelCursor, LevelIterator, RangeDelIterator, Result,
    ScanContext, SeekFlags, TableIterOptions, TableOpener, Tombstone,
};

/// Build a real point pair.
pub fn kv(key: &str, seq: u64) -> InternalKV {
    InternalKV::new(
        InternalKey::for_value(Bytes::copy_from_slice(key.as_bytes()), seq),
        Bytes::from(format!("value_{key}")),
    )
}

/// Iterator position, mirroring a real sstable iterator: exhaustion
/// remembers its direction, so stepping the other way re-enters the data.
#[derive(Clone, Copy, PartialEq, Eq)]
enum IterPos {
    Unpositioned,
    At(usize),
    BeforeFirst,
    AfterLast,
}

/// In-memory point iterator over sorted pairs, honoring bounds.
pub struct VecPointIterator {
    entries: Vec<InternalKV>,
    lower: Option<Bytes>,
    upper: Option<Bytes>,
    pos: IterPos,
    /// Prefixes the iterator pretends not to contain, emulating a bloom
    /// filter miss on `seek_prefix_ge`.
    bloom_miss_prefixes: Vec<Bytes>,
    poison: Option<Error>,
    close_error: Option<Error>,
    closes: Arc<AtomicUsize>,
}

impl VecPointIterator {
    fn in_bounds(&self, idx: usize) -> bool {
        let key = self.entries[idx].user_key();
        if let Some(lower) = &self.lower {
            if key < lower.as_ref() {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            if key >= upper.as_ref() {
                return false;
            }
        }
        true
    }

    /// Land on `idx` moving forward; past-the-end or past the upper bound
    /// exhausts forward.
    fn at_forward(&mut self, idx: usize) -> Option<InternalKV> {
        if idx < self.entries.len() && self.in_bounds(idx) {
            self.pos = IterPos::At(idx);
            Some(self.entries[idx].clone())
        } else {
            self.pos = IterPos::AfterLast;
            None
        }
    }

    /// Land on `idx` moving backward; below the lower bound exhausts
    /// backward.
    fn at_backward(&mut self, idx: usize) -> Option<InternalKV> {
        if idx < self.entries.len() && self.in_bounds(idx) {
            self.pos = IterPos::At(idx);
            Some(self.entries[idx].clone())
        } else {
            self.pos = IterPos::BeforeFirst;
            None
        }
    }

    fn lower_idx(&self, key: &[u8]) -> usize {
        self.entries.partition_point(|kv| kv.user_key() < key)
    }
}

impl InternalIterator for VecPointIterator {
    fn seek_ge(&mut self, key: &[u8], _flags: SeekFlags) -> Option<InternalKV> {
        if self.poison.is_some() {
            return None;
        }
        let target = match &self.lower {
            Some(lower) if key < lower.as_ref() => lower.clone(),
            _ => Bytes::copy_from_slice(key),
        };
        let idx = self.lower_idx(&target);
        self.at_forward(idx)
    }

    fn seek_prefix_ge(
        &mut self,
        prefix: &[u8],
        key: &[u8],
        flags: SeekFlags,
    ) -> Option<InternalKV> {
        if self.bloom_miss_prefixes.iter().any(|p| p == prefix) {
            self.pos = IterPos::Unpositioned;
            return None;
        }
        let found = self.seek_ge(key, flags)?;
        let user_key = found.user_key();
        if user_key.len() >= prefix.len() && &user_key[..prefix.len()] == prefix {
            Some(found)
        } else {
            self.pos = IterPos::Unpositioned;
            None
        }
    }

    fn seek_lt(&mut self, key: &[u8], _flags: SeekFlags) -> Option<InternalKV> {
        if self.poison.is_some() {
            return None;
        }
        let target = match &self.upper {
            Some(upper) if key > upper.as_ref() => upper.clone(),
            _ => Bytes::copy_from_slice(key),
        };
        let idx = self.lower_idx(&target);
        if idx == 0 {
            self.pos = IterPos::BeforeFirst;
            return None;
        }
        self.at_backward(idx - 1)
    }

    fn first(&mut self) -> Option<InternalKV> {
        if self.poison.is_some() {
            return None;
        }
        match self.lower.clone() {
            Some(lower) => {
                let idx = self.lower_idx(&lower);
                self.at_forward(idx)
            }
            None => self.at_forward(0),
        }
    }

    fn last(&mut self) -> Option<InternalKV> {
        if self.poison.is_some() {
            return None;
        }
        let end = match self.upper.clone() {
            Some(upper) => self.lower_idx(&upper),
            None => self.entries.len(),
        };
        if end == 0 {
            self.pos = IterPos::BeforeFirst;
            return None;
        }
        self.at_backward(end - 1)
    }

    fn next(&mut self) -> Option<InternalKV> {
        match self.pos {
            IterPos::At(idx) => self.at_forward(idx + 1),
            IterPos::BeforeFirst => self.first(),
            IterPos::AfterLast | IterPos::Unpositioned => None,
        }
    }

    fn next_prefix(&mut self, succ_key: &[u8]) -> Option<InternalKV> {
        self.seek_ge(succ_key, SeekFlags::NONE)
    }

    fn prev(&mut self) -> Option<InternalKV> {
        match self.pos {
            IterPos::At(0) => {
                self.pos = IterPos::BeforeFirst;
                None
            }
            IterPos::At(idx) => self.at_backward(idx - 1),
            IterPos::AfterLast => self.last(),
            IterPos::BeforeFirst | IterPos::Unpositioned => None,
        }
    }

    fn set_bounds(&mut self, lower: Option<Bytes>, upper: Option<Bytes>) {
        self.lower = lower;
        self.upper = upper;
        self.pos = IterPos::Unpositioned;
    }

    fn error(&self) -> Option<Error> {
        self.poison.clone()
    }

    fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, AtomicOrdering::SeqCst);
        self.pos = IterPos::Unpositioned;
        match &self.close_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// In-memory tombstone iterator with a shared close counter.
pub struct VecTombstoneIterator {
    tombstones: Vec<Tombstone>,
    pos: usize,
    closes: Arc<AtomicUsize>,
}

impl RangeDelIterator for VecTombstoneIterator {
    fn first(&mut self) -> Option<Tombstone> {
        self.pos = 0;
        self.tombstones.first().cloned()
    }

    fn next(&mut self) -> Option<Tombstone> {
        self.pos += 1;
        self.tombstones.get(self.pos).cloned()
    }

    fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

/// Contents of one in-memory table.
#[derive(Default, Clone)]
pub struct TableData {
    pub points: Vec<InternalKV>,
    pub tombstones: Vec<Tombstone>,
    pub bloom_miss_prefixes: Vec<Bytes>,
}

/// Opener over in-memory tables, recording opens and closes.
#[derive(Default)]
pub struct TestOpener {
    tables: HashMap<u64, TableData>,
    fail_files: Vec<u64>,
    poison_files: Vec<u64>,
    close_error_files: Vec<u64>,
    /// (file_number, effective lower, effective upper) per successful open.
    pub opened: Arc<Mutex<Vec<(u64, Option<Bytes>, Option<Bytes>)>>>,
    pub point_closes: Arc<AtomicUsize>,
    pub tombstone_closes: Arc<AtomicUsize>,
}

impl TableOpener for TestOpener {
    fn open(
        &self,
        _ctx: &ScanContext,
        file: &Arc<FileMetadata>,
        opts: &TableIterOptions,
        kinds: IteratorKinds,
    ) -> Result<IterSet> {
        let num = file.file_number();
        if self.fail_files.contains(&num) {
            return Err(Error::table_open(num, "injected failure"));
        }
        let data = self
            .tables
            .get(&num)
            .ok_or_else(|| Error::table_open(num, "unknown file"))?;
        self.opened
            .lock()
            .push((num, opts.lower.clone(), opts.upper.clone()));

        let mut set = IterSet::default();
        if kinds.point() {
            set.point = Some(Box::new(VecPointIterator {
                entries: data.points.clone(),
                lower: opts.lower.clone(),
                upper: opts.upper.clone(),
                pos: IterPos::Unpositioned,
                bloom_miss_prefixes: data.bloom_miss_prefixes.clone(),
                poison: self
                    .poison_files
                    .contains(&num)
                    .then(|| Error::iterator(format!("injected iterator failure in file {num}"))),
                close_error: self
                    .close_error_files
                    .contains(&num)
                    .then(|| Error::CloseError(format!("injected close failure in file {num}"))),
                closes: self.point_closes.clone(),
            }));
        }
        if kinds.range_deletions() && !data.tombstones.is_empty() {
            set.range_deletion = Some(Arc::new(Mutex::new(Box::new(VecTombstoneIterator {
                tombstones: data.tombstones.clone(),
                pos: 0,
                closes: self.tombstone_closes.clone(),
            }) as Box<dyn RangeDelIterator>)));
        }
        Ok(set)
    }
}

/// Builder assembling a level of in-memory files.
#[derive(Default)]
pub struct Fixture {
    metas: Vec<Arc<FileMetadata>>,
    opener: TestOpener,
    next_file: u64,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, meta: FileMetadata, data: TableData) -> u64 {
        let num = meta.file_number();
        self.metas.push(Arc::new(meta));
        self.opener.tables.insert(num, data);
        num
    }

    fn alloc(&mut self) -> u64 {
        self.next_file += 1;
        self.next_file
    }

    /// Add a file of point keys only.
    pub fn add_point_file(&mut self, keys: &[&str]) -> u64 {
        let num = self.alloc();
        let points: Vec<InternalKV> = keys.iter().map(|k| kv(k, 10)).collect();
        let meta = FileMetadata::new(
            num,
            1024,
            points[0].key.clone(),
            points[points.len() - 1].key.clone(),
        );
        self.push(
            meta,
            TableData {
                points,
                ..TableData::default()
            },
        )
    }

    /// Add a file of point keys plus range-deletion tombstones. The file's
    /// point bounds come from the point keys alone.
    pub fn add_tombstone_file(&mut self, keys: &[&str], tombstones: &[(&str, &str, u64)]) -> u64 {
        let num = self.alloc();
        let points: Vec<InternalKV> = keys.iter().map(|k| kv(k, 10)).collect();
        let meta = FileMetadata::new(
            num,
            1024,
            points[0].key.clone(),
            points[points.len() - 1].key.clone(),
        );
        self.push(
            meta,
            TableData {
                points,
                tombstones: tombstones
                    .iter()
                    .map(|(s, e, seq)| {
                        Tombstone::new(
                            Bytes::copy_from_slice(s.as_bytes()),
                            Bytes::copy_from_slice(e.as_bytes()),
                            *seq,
                        )
                    })
                    .collect(),
                ..TableData::default()
            },
        )
    }

    /// Add a file whose largest point key is a range-delete sentinel at
    /// `sentinel_end`.
    pub fn add_sentinel_bounded_file(
        &mut self,
        keys: &[&str],
        sentinel_end: &str,
        tombstones: &[(&str, &str, u64)],
    ) -> u64 {
        let num = self.alloc();
        let points: Vec<InternalKV> = keys.iter().map(|k| kv(k, 10)).collect();
        let meta = FileMetadata::new(
            num,
            1024,
            points[0].key.clone(),
            InternalKey::range_delete_sentinel(Bytes::copy_from_slice(sentinel_end.as_bytes())),
        );
        self.push(
            meta,
            TableData {
                points,
                tombstones: tombstones
                    .iter()
                    .map(|(s, e, seq)| {
                        Tombstone::new(
                            Bytes::copy_from_slice(s.as_bytes()),
                            Bytes::copy_from_slice(e.as_bytes()),
                            *seq,
                        )
                    })
                    .collect(),
                ..TableData::default()
            },
        )
    }

    /// Make `seek_prefix_ge` for `prefix` miss in the given file, as a
    /// bloom filter would for an absent prefix.
    pub fn bloom_miss(&mut self, num: u64, prefix: &str) {
        if let Some(data) = self.opener.tables.get_mut(&num) {
            data.bloom_miss_prefixes
                .push(Bytes::copy_from_slice(prefix.as_bytes()));
        }
    }

    /// Add range-key bounds (and optional range-key-set stats) to the most
    /// recently added file.
    pub fn with_range_keys(&mut self, start: &str, end: &str, num_sets: Option<u64>) {
        let meta = self
            .metas
            .pop()
            .expect("with_range_keys requires a prior file");
        let mut meta = (*meta)
            .clone()
            .with_range_keys(
                InternalKey::new(
                    Bytes::copy_from_slice(start.as_bytes()),
                    5,
                    levelscan::ValueType::RangeKeySet,
                ),
                InternalKey::new(
                    Bytes::copy_from_slice(end.as_bytes()),
                    InternalKey::MAX_SEQUENCE,
                    levelscan::ValueType::RangeKeySet,
                ),
            );
        if let Some(n) = num_sets {
            meta = meta.with_stats(FileStats {
                num_range_key_sets: n,
            });
        }
        self.metas.push(Arc::new(meta));
    }

    /// Add a file holding only range keys.
    pub fn add_range_key_only_file(&mut self, start: &str, end: &str, num_sets: Option<u64>) -> u64 {
        let num = self.alloc();
        let mut meta = FileMetadata::new_range_key_only(
            num,
            512,
            InternalKey::new(
                Bytes::copy_from_slice(start.as_bytes()),
                5,
                levelscan::ValueType::RangeKeySet,
            ),
            InternalKey::new(
                Bytes::copy_from_slice(end.as_bytes()),
                InternalKey::MAX_SEQUENCE,
                levelscan::ValueType::RangeKeySet,
            ),
        );
        if let Some(n) = num_sets {
            meta = meta.with_stats(FileStats {
                num_range_key_sets: n,
            });
        }
        self.metas.push(Arc::new(meta));
        num
    }

    /// Make the opener fail for the given file.
    pub fn fail_file(&mut self, num: u64) {
        self.opener.fail_files.push(num);
    }

    /// Make the file's point iterator fail on every positioning call.
    pub fn poison_file(&mut self, num: u64) {
        self.opener.poison_files.push(num);
    }

    /// Make the file's point iterator fail on close.
    pub fn close_error_file(&mut self, num: u64) {
        self.opener.close_error_files.push(num);
    }

    /// Handle to the opener's open log.
    pub fn opened_log(&self) -> Arc<Mutex<Vec<(u64, Option<Bytes>, Option<Bytes>)>>> {
        self.opener.opened.clone()
    }

    /// Handles to the close counters.
    pub fn close_counters(&self) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (
            self.opener.point_closes.clone(),
            self.opener.tombstone_closes.clone(),
        )
    }

    /// Build the level iterator with a bytewise comparator.
    pub fn into_iter(self, opts: IterOptions) -> LevelIterator {
        self.into_iter_with(opts, Arc::new(levelscan::BytewiseComparator::new()), 3)
    }

    /// Build the level iterator with an explicit comparator and level.
    pub fn into_iter_with(
        self,
        opts: IterOptions,
        cmp: Arc<dyn Comparator>,
        level: usize,
    ) -> LevelIterator {
        LevelIterator::new(
            ScanContext::background(),
            opts,
            cmp,
            Arc::new(self.opener),
            LevelCursor::new(self.metas),
            level,
        )
    }
}

/// Collect the user keys of a full forward walk, excluding synthetic
/// boundaries.
pub fn collect_forward(iter: &mut LevelIterator, start: Option<&[u8]>) -> Vec<String> {
    let mut keys = Vec::new();
    let mut kv = match start {
        Some(key) => iter.seek_ge(key, SeekFlags::NONE),
        None => iter.first(),
    };
    while let Some(pair) = kv {
        if !pair.is_synthetic_boundary() {
            keys.push(String::from_utf8(pair.user_key().to_vec()).unwrap());
        }
        kv = iter.next();
    }
    keys
}

/// Collect the user keys of a full reverse walk, excluding synthetic
/// boundaries.
pub fn collect_reverse(iter: &mut LevelIterator, start: Option<&[u8]>) -> Vec<String> {
    let mut keys = Vec::new();
    let mut kv = match start {
        Some(key) => iter.seek_lt(key, SeekFlags::NONE),
        None => iter.last(),
    };
    while let Some(pair) = kv {
        if !pair.is_synthetic_boundary() {
            keys.push(String::from_utf8(pair.user_key().to_vec()).unwrap());
        }
        kv = iter.prev();
    }
    keys
}
