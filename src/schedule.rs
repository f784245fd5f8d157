//! Ordered, conflict-checked index of scheduled intervals.
//!
//! Only items with both a start time and a duration are indexed; unscheduled
//! items and epics never enter, which removes the comparator edge cases a
//! "sort the unscheduled somewhere" design would have.

use crate::types::{Slot, TaskId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Index of the currently scheduled items, ordered by start time with ids
/// breaking ties.
#[derive(Debug, Default)]
pub struct ScheduleIndex {
    slots: BTreeMap<(DateTime<Utc>, TaskId), Slot>,
}

impl ScheduleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the candidate overlaps no indexed slot of a different id.
    ///
    /// Indexed slots are pairwise disjoint, so the non-empty ones sorted by
    /// start are sorted by end as well; the only possible collision is the
    /// latest-starting one before the candidate's end. Empty slots collide
    /// with nothing and are skipped.
    pub fn is_free(&self, candidate: &Slot) -> bool {
        self.slots
            .range(..(candidate.end, TaskId::MIN))
            .rev()
            .map(|(_, slot)| slot)
            .find(|slot| slot.id != candidate.id && slot.start < slot.end)
            .is_none_or(|slot| !slot.overlaps(candidate))
    }

    /// Index a slot. The caller checks `is_free` first; this does not.
    pub fn add(&mut self, slot: Slot) {
        self.slots.insert((slot.start, slot.id), slot);
    }

    /// Drop a slot, keyed by its start and id. No-op if absent.
    pub fn remove(&mut self, slot: &Slot) {
        self.slots.remove(&(slot.start, slot.id));
    }

    /// Ids of all indexed items, earliest start first.
    pub fn ordered_ids(&self) -> Vec<TaskId> {
        self.slots.values().map(|slot| slot.id).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
