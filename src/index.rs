//! Sequence index and forward-pass linker
//!
//! Append-only ordered log of every kernel record seen so far, in arrival
//! order. Backward-pass kernels are often emitted without their own
//! call-site annotation; the linker walks the log most-recent-first to find
//! the forward-pass record that originated the same sequence id. Frameworks
//! run forward passes in call order and schedule backward passes in reverse,
//! so the nearest preceding forward record with a matching id is the unique
//! correct match in single-pass execution.

use crate::record::{Direction, KernelRecord};

/// Append-only ordered log of kernel records
#[derive(Debug, Default)]
pub struct SequenceIndex {
    records: Vec<KernelRecord>,
}

impl SequenceIndex {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; records are never mutated or removed afterwards
    pub fn push(&mut self, record: KernelRecord) {
        self.records.push(record);
    }

    /// Record at arrival position `idx`
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&KernelRecord> {
        self.records.get(idx)
    }

    /// Number of records appended so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the most recent forward-pass record carrying `target_seq_id`
    ///
    /// Scans in reverse arrival order against each record's sequence-id
    /// list; if no record matches, repeats the scan against the
    /// alternate-sequence-id lists. `None` is a recoverable miss, never an
    /// error.
    #[must_use]
    pub fn find_forward_kernel(&self, target_seq_id: u64) -> Option<usize> {
        self.rev_scan(target_seq_id, false)
            .or_else(|| self.rev_scan(target_seq_id, true))
    }

    fn rev_scan(&self, target_seq_id: u64, use_alt: bool) -> Option<usize> {
        for (idx, k) in self.records.iter().enumerate().rev() {
            if k.dir != Direction::Fprop {
                continue;
            }
            let ids = if use_alt { &k.alt_seq_id } else { &k.seq_id };
            if ids.contains(&target_seq_id) {
                return Some(idx);
            }
        }
        None
    }
}
