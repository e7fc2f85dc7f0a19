//! Attack queue - inbound attack rows shared between a player's engine and
//! whoever attacks it (the local coordinator or a network receive task)
//!
//! Every entry describes exactly one row. A multi-row attack is enqueued as
//! several entries, never as a single entry carrying a count.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// One queued attack row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackEntry {
    pub rows: u8,
    pub gap_column: u8,
}

impl AttackEntry {
    pub fn row(gap_column: u8) -> Self {
        Self {
            rows: 1,
            gap_column,
        }
    }
}

/// Thread-safe FIFO of attack rows waiting to be applied
///
/// Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct AttackQueue {
    inner: Arc<Mutex<VecDeque<AttackEntry>>>,
}

impl AttackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AttackEntry>> {
        // A panicked holder cannot leave the deque half-updated.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue `count` single-row entries, all with the same gap column
    pub fn push_rows(&self, count: usize, gap_column: u8) {
        let mut q = self.lock();
        for _ in 0..count {
            q.push_back(AttackEntry::row(gap_column));
        }
    }

    pub fn push(&self, entry: AttackEntry) {
        self.lock().push_back(entry);
    }

    pub fn pop(&self) -> Option<AttackEntry> {
        self.lock().pop_front()
    }

    /// Number of queued rows
    pub fn len(&self) -> usize {
        self.lock().iter().map(|e| e.rows as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
