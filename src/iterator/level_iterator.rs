//! Level iterator: a merged view of the sstables in one LSM level.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{first_error, Error, Result};
use crate::options::{IterOptions, ScanContext, MAX_NEXTS_BEFORE_SEEK};
use crate::types::InternalKV;
use crate::util::Comparator;
use crate::version::{FileMetadata, LevelCursor};

use super::range_del::{RangeDelHandle, RangeDelSlot};
use super::table_opener::{IterSet, IteratorKinds, TableIterOptions, TableOpener};
use super::{InternalIterator, SeekFlags, SharedCombinedState};

/// Outcome of positioning the level iterator on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadFileResult {
    /// No file is relevant; the inner iterator is closed.
    NoFileLoaded,
    /// The requested file was already open; its iterators were reused.
    AlreadyLoaded,
    /// A new file was opened and its iterators installed.
    NewFileLoaded,
}

/// Counters describing one level iterator's work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelIterStats {
    /// Tables opened through the table opener.
    pub files_loaded: u64,
    /// Synthetic boundary pairs surfaced to the caller.
    pub synthetic_boundaries: u64,
    /// Bounded-next seeks that exhausted their step budget and fell back to
    /// a binary search.
    pub seek_using_next_fallbacks: u64,
}

/// An iterator presenting one LSM level's sstables as a single sorted
/// stream of point keys.
///
/// File selection, lazy open, and per-file bound narrowing are hidden
/// behind the [`InternalIterator`] contract. When a range-deletion slot is
/// registered, iteration additionally pauses at sstable boundaries while
/// the file's tombstones may still be live in the consuming merge: instead
/// of advancing off the file, the iterator surfaces a synthetic boundary
/// pair (an exclusive range-delete sentinel with an empty value) and stays
/// put until stepped again in the same direction.
///
/// A prefix seek that misses inside a tombstone-bearing file pauses the
/// same way: the miss proves nothing about later keys in the file, and
/// advancing would walk the merge off tombstones it has not consumed.
pub struct LevelIterator {
    ctx: ScanContext,
    cmp: Arc<dyn Comparator>,
    /// Iteration bounds as of construction or the last `set_bounds`.
    lower: Option<Bytes>,
    upper: Option<Bytes>,
    /// Effective options for the currently open table. A bound side is
    /// `None` when it does not lie within the table.
    table_opts: TableIterOptions,
    /// The LSM level this iterator reads, for diagnostics.
    level: usize,
    /// Pause registers. At most one is occupied; while occupied the driver
    /// returns the register's pair instead of advancing off the file.
    smallest_boundary: Option<InternalKV>,
    largest_boundary: Option<InternalKV>,
    /// Lazy combined-iteration cell, when the enclosing iterator observes
    /// range keys.
    combined_state: Option<SharedCombinedState>,
    /// The inner point iterator of `iter_file`. `None` when no file is
    /// loaded, an error is pending, or bounds proved the file irrelevant.
    iter: Option<Box<dyn InternalIterator>>,
    /// The currently loaded file. Mirrors the cursor's position.
    iter_file: Option<Arc<FileMetadata>>,
    opener: Arc<dyn TableOpener>,
    /// Tombstone outparam cell, when registered. The slot must hold the
    /// open file's range-deletion iterator and be empty otherwise; the
    /// private copy survives logical closes so re-entry can restore the
    /// slot without reopening the file.
    range_del_slot: Option<RangeDelSlot>,
    range_del_copy: Option<RangeDelHandle>,
    files: LevelCursor,
    /// Sticky error. Set on opener failure; cleared by the next seek.
    err: Option<Error>,
    /// Terminal direction: +1/-1 after exhausting forward/backward, 0
    /// otherwise. Stepping against it restarts from the opposite extreme.
    exhausted_dir: i8,
    stats: LevelIterStats,
}

impl LevelIterator {
    /// Create a level iterator over `files`.
    pub fn new(
        ctx: ScanContext,
        opts: IterOptions,
        comparator: Arc<dyn Comparator>,
        opener: Arc<dyn TableOpener>,
        files: LevelCursor,
        level: usize,
    ) -> Self {
        let table_opts = TableIterOptions::from_iter_options(&opts);
        Self {
            ctx,
            cmp: comparator,
            lower: opts.lower_bound,
            upper: opts.upper_bound,
            table_opts,
            level,
            smallest_boundary: None,
            largest_boundary: None,
            combined_state: None,
            iter: None,
            iter_file: None,
            opener,
            range_del_slot: None,
            range_del_copy: None,
            files,
            err: None,
            exhausted_dir: 0,
            stats: LevelIterStats::default(),
        }
    }

    /// Register the tombstone outparam cell. Called once, before the first
    /// positioning operation, by a consuming merge that needs this level's
    /// range deletions.
    pub fn register_range_del_slot(&mut self, slot: RangeDelSlot) {
        self.range_del_slot = Some(slot);
    }

    /// Register the combined-iteration cell. Called once, before the first
    /// positioning operation, by an enclosing iterator configured for range
    /// keys.
    pub fn register_combined_state(&mut self, state: SharedCombinedState) {
        self.combined_state = Some(state);
    }

    /// Replace the scan context used for subsequently opened tables.
    pub fn set_context(&mut self, ctx: ScanContext) {
        self.ctx = ctx;
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> LevelIterStats {
        self.stats
    }

    /// Whether synthetic boundary pairs may currently be surfaced: a
    /// tombstone slot is registered and the open file populated it.
    fn emit_synthetic_boundaries(&self) -> bool {
        self.range_del_slot.as_ref().map_or(false, |s| !s.is_empty())
    }

    fn make_synthetic_boundary(&mut self, user_key: Bytes) -> InternalKV {
        debug_assert!(
            self.emit_synthetic_boundaries(),
            "{}: synthetic boundary emitted without live range deletions",
            self
        );
        self.stats.synthetic_boundaries += 1;
        InternalKV::synthetic_boundary(user_key)
    }

    fn combined_uninitialized(&self) -> bool {
        self.combined_state
            .as_ref()
            .map_or(false, |s| !s.lock().initialized)
    }

    /// Arm the combined-iteration cell if `file` carries range keys that
    /// overlap the iteration bounds.
    ///
    /// Triggering is lazy: range keys are expected to be rare and the
    /// range-key iterator is costly to build, so the switch happens only
    /// when a qualifying file is actually crossed. Once the enclosing
    /// iterator marks the cell initialized, this is a no-op. Within one
    /// high-level operation multiple levels may trigger; the recorded key
    /// only moves toward the scan's extreme (minimal forward, maximal
    /// backward).
    fn maybe_trigger_combined_iteration(&self, file: &FileMetadata, dir: i8) {
        if !file.has_range_keys() {
            return;
        }
        let Some(state) = &self.combined_state else {
            return;
        };
        let (Some(smallest_rk), Some(largest_rk)) =
            (file.smallest_range_key(), file.largest_range_key())
        else {
            return;
        };
        if let Some(upper) = &self.upper {
            if self.cmp.compare(smallest_rk.user_key(), upper) != Ordering::Less {
                return;
            }
        }
        if let Some(lower) = &self.lower {
            if self.cmp.compare(largest_rk.user_key(), lower) != Ordering::Greater {
                return;
            }
        }
        // Only range key sets surface to readers; a file whose stats prove
        // it holds none cannot require the switch. Absent stats, assume it
        // does.
        if let Some(stats) = file.stats() {
            if stats.num_range_key_sets == 0 {
                return;
            }
        }

        let mut state = state.lock();
        if state.initialized {
            return;
        }
        match dir {
            1 => {
                let candidate = smallest_rk.user_key();
                if !state.triggered {
                    state.triggered = true;
                    state.key = Some(smallest_rk.user_key_bytes());
                } else if state
                    .key
                    .as_ref()
                    .map_or(true, |k| self.cmp.compare(k, candidate) == Ordering::Greater)
                {
                    state.key = Some(smallest_rk.user_key_bytes());
                }
            }
            _ => {
                let candidate = largest_rk.user_key();
                if !state.triggered {
                    state.triggered = true;
                    state.key = Some(largest_rk.user_key_bytes());
                } else if state
                    .key
                    .as_ref()
                    .map_or(true, |k| self.cmp.compare(k, candidate) == Ordering::Less)
                {
                    state.key = Some(largest_rk.user_key_bytes());
                }
            }
        }
    }

    /// Find the earliest file whose largest point key is `>= key`.
    ///
    /// With `TRY_SEEK_USING_NEXT` the target is at or past the current
    /// position, so a handful of forward steps usually beats a fresh binary
    /// search; the step budget bounds the loss when it does not. The
    /// stepped-to file can legitimately differ from what a fresh search
    /// would find: the current position already encodes that earlier files'
    /// qualifying keys are dead, and a caller seeking forward must never be
    /// handed a key behind its position.
    ///
    /// With `RELATIVE_SEEK`, while combined iteration is uninitialized,
    /// seeking is forbidden outright: every intermediate file's metadata
    /// must pass through the combined-iteration trigger, so traversal is
    /// one step at a time without a budget.
    fn find_file_ge(&mut self, key: &[u8], flags: SeekFlags) -> Option<Arc<FileMetadata>> {
        let mut nexts_until_seek: i64 = 0;
        let mut next_instead_of_seek = false;
        if flags.try_seek_using_next() {
            next_instead_of_seek = true;
            nexts_until_seek = MAX_NEXTS_BEFORE_SEEK as i64;
        }
        if flags.relative_seek() && self.combined_uninitialized() {
            next_instead_of_seek = true;
            nexts_until_seek = -1;
        }

        let mut m = if next_instead_of_seek {
            self.iter_file.clone()
        } else {
            self.files.seek_ge(self.cmp.as_ref(), key)
        };
        while let Some(file) = m {
            if file.has_range_keys() {
                self.maybe_trigger_combined_iteration(&file, 1);

                // Files holding only range keys have no point keys to
                // surface here.
                if !file.has_point_keys() {
                    m = self.files.next();
                    continue;
                }
            }

            // The file has point keys, but may still sit entirely before
            // `key`: a seek landed here via range-key bounds, or stepping
            // has not yet gone far enough.
            let Some(largest_point) = file.largest_point_key() else {
                m = self.files.next();
                continue;
            };
            if (file.has_range_keys() || next_instead_of_seek)
                && self.cmp.compare(largest_point.user_key(), key) == Ordering::Less
            {
                if next_instead_of_seek && nexts_until_seek == 0 {
                    next_instead_of_seek = false;
                    self.stats.seek_using_next_fallbacks += 1;
                    m = self.files.seek_ge(self.cmp.as_ref(), key);
                    continue;
                } else if nexts_until_seek > 0 {
                    nexts_until_seek -= 1;
                }
                m = self.files.next();
                continue;
            }

            // A largest point key that is an exclusive sentinel equal to
            // `key` bounds the file without containing `key`. Opening such
            // a file would surface tombstones irrelevant to the seek.
            if largest_point.is_exclusive_sentinel()
                && self.cmp.compare(largest_point.user_key(), key) == Ordering::Equal
            {
                m = self.files.next();
                continue;
            }

            return Some(file);
        }
        None
    }

    /// Find the latest file whose smallest point key is `< key`.
    ///
    /// `RELATIVE_SEEK` forces one-file-at-a-time traversal for the same
    /// reason as in [`Self::find_file_ge`]; there is no bounded-prev
    /// heuristic.
    fn find_file_lt(&mut self, key: &[u8], flags: SeekFlags) -> Option<Arc<FileMetadata>> {
        let prev_instead_of_seek = flags.relative_seek() && self.combined_uninitialized();

        let mut m = if prev_instead_of_seek {
            self.iter_file.clone()
        } else {
            self.files.seek_lt(self.cmp.as_ref(), key)
        };
        while let Some(file) = m {
            if file.has_range_keys() {
                self.maybe_trigger_combined_iteration(&file, -1);

                if !file.has_point_keys() {
                    m = self.files.prev();
                    continue;
                }
            }

            let Some(smallest_point) = file.smallest_point_key() else {
                m = self.files.prev();
                continue;
            };
            if (file.has_range_keys() || prev_instead_of_seek)
                && self.cmp.compare(smallest_point.user_key(), key) != Ordering::Less
            {
                m = self.files.prev();
                continue;
            }

            return Some(file);
        }
        None
    }

    /// Narrow the iteration bounds to `f`, storing the per-table bounds in
    /// `table_opts`. Returns -1 if the table lies fully before the lower
    /// bound, +1 if fully past the upper bound, 0 if it overlaps. A bound
    /// side the file's own extremes already enforce is elided, sparing the
    /// sstable iterator a per-key comparison.
    fn init_table_bounds(&mut self, f: &FileMetadata) -> i8 {
        let (Some(smallest_point), Some(largest_point)) =
            (f.smallest_point_key(), f.largest_point_key())
        else {
            return 0;
        };
        self.table_opts.lower = self.lower.clone();
        if let Some(lower) = &self.table_opts.lower {
            if self.cmp.compare(largest_point.user_key(), lower) == Ordering::Less {
                return -1;
            }
            if self.cmp.compare(lower, smallest_point.user_key()) != Ordering::Greater {
                self.table_opts.lower = None;
            }
        }
        self.table_opts.upper = self.upper.clone();
        if let Some(upper) = &self.table_opts.upper {
            if self.cmp.compare(smallest_point.user_key(), upper) != Ordering::Less {
                return 1;
            }
            // The upper bound is exclusive while the largest point key is
            // inclusive, so strictly-greater suffices to elide it.
            if self.cmp.compare(upper, largest_point.user_key()) == Ordering::Greater {
                self.table_opts.upper = None;
            }
        }
        0
    }

    fn same_file(a: &Option<Arc<FileMetadata>>, b: &Option<Arc<FileMetadata>>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Position on `file`, opening it if necessary.
    ///
    /// Reloading the already-open file restores the tombstone slot from the
    /// private copy and re-evaluates the combined-iteration trigger: bounds
    /// may have widened since the previous load, newly exposing this file's
    /// range keys. Otherwise both inner iterators are closed and files are
    /// walked in `dir` until one overlaps the bounds, skipping range-key
    /// only files. Walking past the bounds against `dir` means the scan
    /// overshot and nothing is loaded.
    fn load_file(&mut self, file: Option<Arc<FileMetadata>>, dir: i8) -> LoadFileResult {
        self.smallest_boundary = None;
        self.largest_boundary = None;
        if Self::same_file(&self.iter_file, &file) {
            if self.err.is_some() {
                return LoadFileResult::NoFileLoaded;
            }
            if self.iter.is_some() {
                // The open iterator knows the current bounds and enforces
                // them, so the file bounds need no re-check here.
                if let Some(slot) = &self.range_del_slot {
                    slot.set(self.range_del_copy.clone());
                }
                if let Some(f) = &file {
                    self.maybe_trigger_combined_iteration(f, dir);
                }
                return LoadFileResult::AlreadyLoaded;
            }
            // Already at the file but without an iterator: the file was
            // beyond the previous bounds. The bounds may have changed, so
            // fall through and re-evaluate.
        }

        // The consuming merge reads the slot but never closes its handle;
        // it cannot know when the handle is about to be swapped. Closing
        // both iterators here is the defined handoff point.
        if self.close().is_err() {
            return LoadFileResult::NoFileLoaded;
        }

        let mut file = file;
        loop {
            self.iter_file = file.clone();
            let Some(f) = file else {
                return LoadFileResult::NoFileLoaded;
            };

            self.maybe_trigger_combined_iteration(&f, dir);
            if !f.has_point_keys() {
                file = if dir > 0 {
                    self.files.next()
                } else {
                    self.files.prev()
                };
                continue;
            }

            match self.init_table_bounds(&f) {
                -1 => {
                    // The table ends before the lower bound.
                    if dir < 0 {
                        return LoadFileResult::NoFileLoaded;
                    }
                    file = self.files.next();
                    continue;
                }
                1 => {
                    // The table starts at or past the upper bound.
                    if dir > 0 {
                        return LoadFileResult::NoFileLoaded;
                    }
                    file = self.files.prev();
                    continue;
                }
                _ => {}
            }

            let mut kinds = IteratorKinds::POINT;
            if self.range_del_slot.is_some() {
                kinds = kinds.with_range_deletions();
            }

            let iters: IterSet = match self.opener.open(&self.ctx, &f, &self.table_opts, kinds) {
                Ok(iters) => iters,
                Err(e) => {
                    self.err = Some(e);
                    return LoadFileResult::NoFileLoaded;
                }
            };
            let Some(point) = iters.point else {
                self.err = Some(Error::internal(format!(
                    "table opener returned no point iterator for file {}",
                    f.file_number()
                )));
                return LoadFileResult::NoFileLoaded;
            };
            self.iter = Some(point);
            if let Some(slot) = &self.range_del_slot {
                slot.set(iters.range_deletion.clone());
                self.range_del_copy = iters.range_deletion;
            }
            self.stats.files_loaded += 1;
            return LoadFileResult::NewFileLoaded;
        }
    }

    /// Debug-build check that returned pairs honor the bounds. Boundary
    /// pairs are exempt: they may sit on a bound and the consuming merge
    /// skips them.
    fn verify(&self, kv: Option<InternalKV>) -> Option<InternalKV> {
        if cfg!(debug_assertions) {
            if let Some(kv) = &kv {
                if let Some(lower) = &self.lower {
                    if self.smallest_boundary.as_ref() != Some(kv)
                        && self.cmp.compare(kv.user_key(), lower) == Ordering::Less
                    {
                        panic!("{}: lower bound violation: {:?} < {:?}", self, kv.user_key(), lower);
                    }
                }
                if let Some(upper) = &self.upper {
                    if self.largest_boundary.as_ref() != Some(kv)
                        && self.cmp.compare(kv.user_key(), upper) == Ordering::Greater
                    {
                        panic!("{}: upper bound violation: {:?} > {:?}", self, kv.user_key(), upper);
                    }
                }
            }
        }
        kv
    }

    /// Walk forward over files until one yields a pair, pausing first if
    /// the exhausted file's tombstones are still live.
    ///
    /// Entered with the inner iterator already exhausted, either at the end
    /// of the sstable or early at the upper bound or a prefix miss. With a
    /// registered slot the merge must finish consuming this file's
    /// tombstones before the slot is swapped, so exhaustion is masked by a
    /// boundary pair: at the in-table upper bound when one exists, else at
    /// the file's largest point key.
    fn skip_empty_file_forward(&mut self) -> Option<InternalKV> {
        loop {
            if self.iter.as_ref().and_then(|i| i.error()).is_some() {
                return None;
            }
            if self.range_del_slot.is_some() {
                if let Some(upper) = self.table_opts.upper.clone() {
                    self.exhausted_dir = 1;
                    if !self.emit_synthetic_boundaries() {
                        // No tombstones in this table. Common when many
                        // levels hold sstables with nothing inside the
                        // bounds; returning directly avoids a pointless
                        // pause.
                        return None;
                    }
                    let boundary = self.make_synthetic_boundary(upper);
                    self.largest_boundary = Some(boundary.clone());
                    return Some(boundary);
                }
                if self.emit_synthetic_boundaries() {
                    // Block filters may have skipped a tail of the point
                    // keys, so tombstones can extend past the last pair
                    // returned even without a bound in play.
                    let user_key = self
                        .iter_file
                        .as_ref()
                        .and_then(|f| f.largest_point_key())?
                        .user_key_bytes();
                    let boundary = self.make_synthetic_boundary(user_key);
                    self.largest_boundary = Some(boundary.clone());
                    return Some(boundary);
                }
            }

            let next = self.files.next();
            if self.load_file(next, 1) == LoadFileResult::NoFileLoaded {
                self.exhausted_dir = 1;
                return None;
            }
            if let Some(kv) = self.iter.as_mut().and_then(|i| i.first()) {
                return Some(kv);
            }
        }
    }

    /// Backward counterpart of [`Self::skip_empty_file_forward`], pausing
    /// at the in-table lower bound or the file's smallest point key. The
    /// smallest-key sentinel sorts before every real pair with that user
    /// key, preserving reverse ordering.
    fn skip_empty_file_backward(&mut self) -> Option<InternalKV> {
        loop {
            if self.iter.as_ref().and_then(|i| i.error()).is_some() {
                return None;
            }
            if self.range_del_slot.is_some() {
                if let Some(lower) = self.table_opts.lower.clone() {
                    self.exhausted_dir = -1;
                    if !self.emit_synthetic_boundaries() {
                        return None;
                    }
                    let boundary = self.make_synthetic_boundary(lower);
                    self.smallest_boundary = Some(boundary.clone());
                    return Some(boundary);
                }
                if self.emit_synthetic_boundaries() {
                    let user_key = self
                        .iter_file
                        .as_ref()
                        .and_then(|f| f.smallest_point_key())?
                        .user_key_bytes();
                    let boundary = self.make_synthetic_boundary(user_key);
                    self.smallest_boundary = Some(boundary.clone());
                    return Some(boundary);
                }
            }

            let prev = self.files.prev();
            if self.load_file(prev, -1) == LoadFileResult::NoFileLoaded {
                self.exhausted_dir = -1;
                return None;
            }
            if let Some(kv) = self.iter.as_mut().and_then(|i| i.last()) {
                return Some(kv);
            }
        }
    }
}

impl InternalIterator for LevelIterator {
    fn seek_ge(&mut self, key: &[u8], flags: SeekFlags) -> Option<InternalKV> {
        debug_assert!(
            self.lower
                .as_ref()
                .map_or(true, |lower| self.cmp.compare(key, lower) != Ordering::Less),
            "{}: seek_ge target below the lower bound",
            self
        );

        self.err = None;
        self.exhausted_dir = 0;
        let mut flags = flags;
        // The caller has already clamped `key` to the lower bound.
        let target = self.find_file_ge(key, flags);
        match self.load_file(target, 1) {
            LoadFileResult::NoFileLoaded => {
                self.exhausted_dir = 1;
                return None;
            }
            LoadFileResult::NewFileLoaded => {
                // A fresh inner iterator holds no position for the hint to
                // build on.
                flags = flags.disable_try_seek_using_next();
            }
            LoadFileResult::AlreadyLoaded => {}
        }
        if let Some(kv) = self.iter.as_mut().and_then(|i| i.seek_ge(key, flags)) {
            return self.verify(Some(kv));
        }
        let kv = self.skip_empty_file_forward();
        self.verify(kv)
    }

    fn seek_prefix_ge(
        &mut self,
        prefix: &[u8],
        key: &[u8],
        flags: SeekFlags,
    ) -> Option<InternalKV> {
        debug_assert!(
            self.lower
                .as_ref()
                .map_or(true, |lower| self.cmp.compare(key, lower) != Ordering::Less),
            "{}: seek_prefix_ge target below the lower bound",
            self
        );

        self.err = None;
        self.exhausted_dir = 0;
        let mut flags = flags;
        let target = self.find_file_ge(key, flags);
        match self.load_file(target, 1) {
            LoadFileResult::NoFileLoaded => {
                self.exhausted_dir = 1;
                return None;
            }
            LoadFileResult::NewFileLoaded => {
                flags = flags.disable_try_seek_using_next();
            }
            LoadFileResult::AlreadyLoaded => {}
        }
        if let Some(kv) = self
            .iter
            .as_mut()
            .and_then(|i| i.seek_prefix_ge(prefix, key, flags))
        {
            return self.verify(Some(kv));
        }
        if self.iter.as_ref().and_then(|i| i.error()).is_some() {
            return None;
        }
        // A prefix miss says nothing about the rest of this sstable, only
        // that no key with the prefix is present. The seek key itself lies
        // within this file's bounds, so the file must stay open while its
        // tombstones are live in the merge.
        if self.emit_synthetic_boundaries() {
            if let Some(upper) = self.table_opts.upper.clone() {
                let boundary = self.make_synthetic_boundary(upper);
                self.largest_boundary = Some(boundary.clone());
                self.exhausted_dir = 1;
                return self.verify(Some(boundary));
            }
            let user_key = self
                .iter_file
                .as_ref()
                .and_then(|f| f.largest_point_key())?
                .user_key_bytes();
            let boundary = self.make_synthetic_boundary(user_key);
            self.largest_boundary = Some(boundary.clone());
            return self.verify(Some(boundary));
        }
        // Likely a filter miss. If every key with this prefix would sort
        // inside the current file, later files cannot hold one either, and
        // cold-opening the next file would also defeat the seek-using-next
        // hint of the caller's following seek in sparse keyspaces.
        let largest = self
            .iter_file
            .as_ref()
            .and_then(|f| f.largest_point_key())?
            .user_key_bytes();
        let n = self.cmp.split(&largest);
        if self.cmp.compare(prefix, &largest[..n]) == Ordering::Less {
            self.exhausted_dir = 1;
            return None;
        }
        let kv = self.skip_empty_file_forward();
        self.verify(kv)
    }

    fn seek_lt(&mut self, key: &[u8], flags: SeekFlags) -> Option<InternalKV> {
        debug_assert!(
            self.upper
                .as_ref()
                .map_or(true, |upper| self.cmp.compare(key, upper) != Ordering::Greater),
            "{}: seek_lt target above the upper bound",
            self
        );

        self.err = None;
        self.exhausted_dir = 0;
        // The caller has already clamped `key` to the upper bound.
        let target = self.find_file_lt(key, flags);
        if self.load_file(target, -1) == LoadFileResult::NoFileLoaded {
            self.exhausted_dir = -1;
            return None;
        }
        if let Some(kv) = self.iter.as_mut().and_then(|i| i.seek_lt(key, flags)) {
            return self.verify(Some(kv));
        }
        let kv = self.skip_empty_file_backward();
        self.verify(kv)
    }

    fn first(&mut self) -> Option<InternalKV> {
        debug_assert!(
            self.lower.is_none(),
            "{}: first called while a lower bound is set",
            self
        );

        self.err = None;
        self.exhausted_dir = 0;
        // Callers with a lower bound use seek_ge instead.
        let target = self.files.first();
        if self.load_file(target, 1) == LoadFileResult::NoFileLoaded {
            self.exhausted_dir = 1;
            return None;
        }
        if let Some(kv) = self.iter.as_mut().and_then(|i| i.first()) {
            return self.verify(Some(kv));
        }
        let kv = self.skip_empty_file_forward();
        self.verify(kv)
    }

    fn last(&mut self) -> Option<InternalKV> {
        debug_assert!(
            self.upper.is_none(),
            "{}: last called while an upper bound is set",
            self
        );

        self.err = None;
        self.exhausted_dir = 0;
        // Callers with an upper bound use seek_lt instead.
        let target = self.files.last();
        if self.load_file(target, -1) == LoadFileResult::NoFileLoaded {
            self.exhausted_dir = -1;
            return None;
        }
        if let Some(kv) = self.iter.as_mut().and_then(|i| i.last()) {
            return self.verify(Some(kv));
        }
        let kv = self.skip_empty_file_backward();
        self.verify(kv)
    }

    fn next(&mut self) -> Option<InternalKV> {
        if self.exhausted_dir == -1 {
            if let Some(lower) = self.lower.clone() {
                return self.seek_ge(&lower, SeekFlags::NONE);
            }
            return self.first();
        }
        if self.err.is_some() || self.iter.is_none() {
            return None;
        }

        if self.largest_boundary.is_some() {
            if self.table_opts.upper.is_some() {
                // The upper bound fell inside this file; there is no later
                // file to load. The register stays occupied so repeated
                // next() calls keep the file pinned; any reposition that
                // still wants this file clears it in load_file.
                if let Some(slot) = &self.range_del_slot {
                    slot.clear();
                }
                self.exhausted_dir = 1;
                return None;
            }
            // Stepping past the boundary pair: the pause is over and the
            // next file may be loaded.
            let target = self.files.next();
            if self.load_file(target, 1) != LoadFileResult::NoFileLoaded {
                if let Some(kv) = self.iter.as_mut().and_then(|i| i.first()) {
                    return self.verify(Some(kv));
                }
                let kv = self.skip_empty_file_forward();
                return self.verify(kv);
            }
            self.exhausted_dir = 1;
            return None;
        }

        // Moving forward releases any backward pause.
        self.smallest_boundary = None;
        if let Some(kv) = self.iter.as_mut().and_then(|i| i.next()) {
            return self.verify(Some(kv));
        }
        let kv = self.skip_empty_file_forward();
        self.verify(kv)
    }

    fn next_prefix(&mut self, succ_key: &[u8]) -> Option<InternalKV> {
        if self.err.is_some() || self.iter.is_none() {
            return None;
        }

        if self.largest_boundary.is_some() {
            if self.table_opts.upper.is_some() {
                if let Some(slot) = &self.range_del_slot {
                    slot.clear();
                }
                return None;
            }
            // Stepping past the boundary pair; a later file holds the
            // successor.
        } else {
            self.smallest_boundary = None;
            if let Some(kv) = self.iter.as_mut().and_then(|i| i.next_prefix(succ_key)) {
                return self.verify(Some(kv));
            }
            if self.iter.as_ref().and_then(|i| i.error()).is_some() {
                return None;
            }
        }

        // The successor can only live in this file's suffix or a later
        // file, so both hints apply to the metadata walk.
        let seek_flags = SeekFlags::NONE
            .enable_try_seek_using_next()
            .enable_relative_seek();
        let target = self.find_file_ge(succ_key, seek_flags);
        if self.load_file(target, 1) != LoadFileResult::NoFileLoaded {
            // The fresh inner iterator is unpositioned; no seek-using-next
            // hint may be forwarded to it.
            if let Some(kv) = self
                .iter
                .as_mut()
                .and_then(|i| i.seek_ge(succ_key, SeekFlags::NONE))
            {
                return self.verify(Some(kv));
            }
            let kv = self.skip_empty_file_forward();
            return self.verify(kv);
        }
        self.exhausted_dir = 1;
        None
    }

    fn prev(&mut self) -> Option<InternalKV> {
        if self.exhausted_dir == 1 {
            if let Some(upper) = self.upper.clone() {
                return self.seek_lt(&upper, SeekFlags::NONE);
            }
            return self.last();
        }
        if self.err.is_some() || self.iter.is_none() {
            return None;
        }

        if self.smallest_boundary.is_some() {
            if self.table_opts.lower.is_some() {
                // The lower bound fell inside this file; no earlier file
                // to load.
                if let Some(slot) = &self.range_del_slot {
                    slot.clear();
                }
                self.exhausted_dir = -1;
                return None;
            }
            let target = self.files.prev();
            if self.load_file(target, -1) != LoadFileResult::NoFileLoaded {
                if let Some(kv) = self.iter.as_mut().and_then(|i| i.last()) {
                    return self.verify(Some(kv));
                }
                let kv = self.skip_empty_file_backward();
                return self.verify(kv);
            }
            self.exhausted_dir = -1;
            return None;
        }

        // Moving backward releases any forward pause.
        self.largest_boundary = None;
        if let Some(kv) = self.iter.as_mut().and_then(|i| i.prev()) {
            return self.verify(Some(kv));
        }
        let kv = self.skip_empty_file_backward();
        self.verify(kv)
    }

    fn set_bounds(&mut self, lower: Option<Bytes>, upper: Option<Bytes>) {
        self.lower = lower;
        self.upper = upper;

        let Some(file) = self.iter_file.clone() else {
            return;
        };
        if self.iter.is_none() {
            return;
        }

        if self.init_table_bounds(&file) != 0 {
            // The table no longer overlaps the bounds. A close failure is
            // recorded in the sticky error.
            let _ = self.close();
            return;
        }

        if let Some(iter) = self.iter.as_mut() {
            iter.set_bounds(self.table_opts.lower.clone(), self.table_opts.upper.clone());
        }
    }

    fn error(&self) -> Option<Error> {
        if self.err.is_some() || self.iter.is_none() {
            return self.err.clone();
        }
        self.iter.as_ref().and_then(|i| i.error())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut iter) = self.iter.take() {
            self.err = iter.close().err();
        }
        if let Some(slot) = &self.range_del_slot {
            if let Some(copy) = self.range_del_copy.take() {
                let close_err = copy.lock().close().err();
                self.err = first_error(self.err.take(), close_err);
            }
            slot.clear();
        }
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for LevelIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.iter_file {
            Some(file) => write!(f, "level {}: file_number={}", self.level, file.file_number()),
            None => write!(f, "level {}: file_number=<none>", self.level),
        }
    }
}
