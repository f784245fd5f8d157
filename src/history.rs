//! Recency-ordered index of entities fetched by id.
//!
//! Each id appears at most once; re-recording an id moves it to the
//! most-recent position. Entries are copies taken at record time, so later
//! store mutation never changes what a snapshot reports.

use crate::types::{Entity, TaskId};
use std::collections::{BTreeMap, HashMap};

/// Access-ordered, duplicate-free view history.
///
/// Entries live in a sequence-ordered map keyed by a monotonic counter; a
/// second map resolves ids to their current sequence number. Record is
/// remove-then-append, so both lookup and reorder stay cheap.
#[derive(Debug, Default)]
pub struct HistoryIndex {
    /// Most-recent entries to keep; `None` keeps everything.
    capacity: Option<usize>,
    seq: u64,
    by_id: HashMap<TaskId, u64>,
    ordered: BTreeMap<u64, Entity>,
}

impl HistoryIndex {
    /// Unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// History bounded to the `capacity` most recent entries, oldest evicted.
    /// `None` is unbounded.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Note an access. The entry lands at the most-recent position; a prior
    /// entry for the same id is dropped first.
    pub fn record(&mut self, entity: Entity) {
        self.forget(entity.id());
        self.seq += 1;
        self.by_id.insert(entity.id(), self.seq);
        self.ordered.insert(self.seq, entity);

        if let Some(capacity) = self.capacity {
            while self.ordered.len() > capacity {
                let Some((_, oldest)) = self.ordered.pop_first() else {
                    break;
                };
                self.by_id.remove(&oldest.id());
            }
        }
    }

    /// Drop the entry for `id`, if any.
    pub fn forget(&mut self, id: TaskId) {
        if let Some(seq) = self.by_id.remove(&id) {
            self.ordered.remove(&seq);
        }
    }

    /// Drop entries for every id in the collection.
    pub fn forget_all(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        for id in ids {
            self.forget(id);
        }
    }

    /// The recorded entries, oldest first. Independent of later mutation.
    pub fn snapshot(&self) -> Vec<Entity> {
        self.ordered.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
