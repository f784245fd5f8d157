//! Shared test infrastructure for Slate integration tests.
//!
//! Provides TestEnv plus a fixed clock so scheduling scenarios read as
//! plain wall times.

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use slate::{Entity, Epic, Status, StoreError, Subtask, Task, TaskId, TaskStore};

/// A time on the fixed test day.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    format!("2025-02-18T{hour:02}:{minute:02}:00Z").parse().unwrap()
}

/// Test environment around a fresh in-memory store.
pub struct TestEnv {
    pub store: TaskStore,
}

impl TestEnv {
    /// Store with unbounded history.
    pub fn new() -> Self {
        Self {
            store: TaskStore::new(),
        }
    }

    /// Store keeping only the `capacity` most recent history entries.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            store: TaskStore::with_history_capacity(Some(capacity)),
        }
    }

    /// Create an unscheduled task.
    pub fn create_task(&mut self, name: &str) -> Task {
        self.store
            .create_task(Task::new(name, None, Status::New, None, None))
            .expect("Failed to create task")
    }

    /// Create a task scheduled at the given time for `minutes`.
    pub fn create_scheduled_task(&mut self, name: &str, hour: u32, minute: u32, minutes: u32) -> Task {
        self.try_scheduled_task(name, hour, minute, minutes)
            .expect("Failed to create scheduled task")
    }

    /// Attempt a scheduled task, surfacing conflicts to the test.
    pub fn try_scheduled_task(
        &mut self,
        name: &str,
        hour: u32,
        minute: u32,
        minutes: u32,
    ) -> Result<Task, StoreError> {
        self.store
            .create_task(Task::new(name, None, Status::New, Some(at(hour, minute)), Some(minutes)))
    }

    /// Create an epic.
    pub fn create_epic(&mut self, name: &str) -> Epic {
        self.store
            .create_epic(Epic::new(name, None))
            .expect("Failed to create epic")
    }

    /// Create an unscheduled subtask under the epic.
    pub fn create_subtask(&mut self, name: &str, epic_id: TaskId) -> Subtask {
        self.store
            .create_subtask(Subtask::new(name, None, Status::New, epic_id, None, None))
            .expect("Failed to create subtask")
    }

    /// Create a scheduled subtask under the epic.
    pub fn create_scheduled_subtask(
        &mut self,
        name: &str,
        epic_id: TaskId,
        hour: u32,
        minute: u32,
        minutes: u32,
    ) -> Subtask {
        self.store
            .create_subtask(Subtask::new(
                name,
                None,
                Status::New,
                epic_id,
                Some(at(hour, minute)),
                Some(minutes),
            ))
            .expect("Failed to create scheduled subtask")
    }

    /// Move a subtask to a new status through the update path.
    pub fn set_subtask_status(&mut self, id: TaskId, status: Status) -> Subtask {
        let subtask = self.store.get_subtask(id).expect("Subtask not found");
        self.store
            .update_subtask(Subtask { status, ..subtask })
            .expect("Failed to update subtask")
    }

    /// Current epic state, read without going through history.
    pub fn epic(&self, id: TaskId) -> Epic {
        self.store
            .get_all_epics()
            .into_iter()
            .find(|epic| epic.id == id)
            .expect("Epic not found")
    }

    /// Ids in the history snapshot, oldest first.
    pub fn history_ids(&self) -> Vec<TaskId> {
        self.store.history().iter().map(Entity::id).collect()
    }

    /// Ids in the prioritized view, earliest start first.
    pub fn prioritized_ids(&self) -> Vec<TaskId> {
        self.store.prioritized().iter().map(Entity::id).collect()
    }

    /// Check the no-overlap invariant over everything currently scheduled.
    pub fn assert_no_overlaps(&self) {
        let windows: Vec<(TaskId, DateTime<Utc>, DateTime<Utc>)> = self
            .store
            .prioritized()
            .iter()
            .filter_map(|entity| {
                let start = entity.start_time()?;
                let minutes = entity.duration_minutes()?;
                Some((entity.id(), start, start + TimeDelta::minutes(i64::from(minutes))))
            })
            .collect();

        for (i, a) in windows.iter().enumerate() {
            for b in windows.iter().skip(i + 1) {
                assert!(
                    a.1.max(b.1) >= a.2.min(b.2),
                    "items {} and {} overlap",
                    a.0,
                    b.0
                );
            }
        }
    }
}
