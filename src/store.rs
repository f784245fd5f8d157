//! The task store: owner of all entities and the only mutator of the graph.
//!
//! Every public operation either commits with all invariants re-established
//! or returns an error leaving the store exactly as it was.

use crate::history::HistoryIndex;
use crate::schedule::ScheduleIndex;
use crate::types::{Entity, Epic, Slot, Status, Subtask, Task, TaskId};
use std::collections::HashMap;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No live entity of the expected kind under this id.
    NotFound(TaskId),
    /// Subtask creation referenced a non-existent epic.
    ParentNotFound(TaskId),
    /// Subtask update tried to move it to a different epic.
    ParentMismatch { expected: TaskId, got: TaskId },
    /// The scheduled period overlaps another scheduled item.
    SchedulingConflict,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "no entity with id {}", id),
            StoreError::ParentNotFound(id) => write!(f, "no epic with id {} to own the subtask", id),
            StoreError::ParentMismatch { expected, got } => {
                write!(f, "subtask belongs to epic {} and cannot move to epic {}", expected, got)
            }
            StoreError::SchedulingConflict => {
                write!(f, "scheduled period overlaps another scheduled item")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// The in-memory task graph engine.
///
/// Owns the entity maps, assigns ids from one counter shared by all kinds,
/// keeps every epic's derived state in step with its subtasks, and feeds the
/// schedule and history indices on each mutation. Read operations hand out
/// independent copies; callers can never alias stored state.
pub struct TaskStore {
    tasks: HashMap<TaskId, Task>,
    epics: HashMap<TaskId, Epic>,
    subtasks: HashMap<TaskId, Subtask>,
    history: HistoryIndex,
    schedule: ScheduleIndex,
    counter: TaskId,
}

impl TaskStore {
    /// Empty store with unbounded history.
    pub fn new() -> Self {
        Self::with_history_capacity(None)
    }

    /// Empty store keeping at most `capacity` history entries (`None` keeps
    /// everything).
    pub fn with_history_capacity(capacity: Option<usize>) -> Self {
        Self {
            tasks: HashMap::new(),
            epics: HashMap::new(),
            subtasks: HashMap::new(),
            history: HistoryIndex::with_capacity(capacity),
            schedule: ScheduleIndex::new(),
            counter: 0,
        }
    }

    /// Rebuild a store from previously stored records.
    ///
    /// For persistence loaders: ids are trusted, parent links and both
    /// indices are rebuilt, epic state is recomputed, and the id counter
    /// resumes past the maximum id seen. Subtasks whose epic is missing are
    /// dropped rather than left dangling.
    pub fn restore(
        tasks: Vec<Task>,
        epics: Vec<Epic>,
        subtasks: Vec<Subtask>,
        history_capacity: Option<usize>,
    ) -> Self {
        let mut store = Self::with_history_capacity(history_capacity);

        for epic in epics {
            store.counter = store.counter.max(epic.id);
            store.epics.insert(epic.id, Epic { subtask_ids: Vec::new(), ..epic });
        }
        for task in tasks {
            store.counter = store.counter.max(task.id);
            store.index_restored(task.slot());
            store.tasks.insert(task.id, task);
        }
        for subtask in subtasks {
            let Some(epic) = store.epics.get_mut(&subtask.epic_id) else {
                log::warn!(
                    "dropping restored subtask {}: epic {} does not exist",
                    subtask.id,
                    subtask.epic_id
                );
                continue;
            };
            epic.subtask_ids.push(subtask.id);
            store.counter = store.counter.max(subtask.id);
            store.index_restored(subtask.slot());
            store.subtasks.insert(subtask.id, subtask);
        }

        let epic_ids: Vec<TaskId> = store.epics.keys().copied().collect();
        for id in epic_ids {
            store.refresh_epic(id);
        }
        store
    }

    fn index_restored(&mut self, slot: Option<Slot>) {
        if let Some(slot) = slot {
            if !self.schedule.is_free(&slot) {
                log::warn!("restored item {} overlaps another scheduled item", slot.id);
            }
            self.schedule.add(slot);
        }
    }

    fn next_id(&mut self) -> TaskId {
        self.counter += 1;
        self.counter
    }

    /// Create a task. Fails if its scheduled period collides.
    pub fn create_task(&mut self, draft: Task) -> Result<Task, StoreError> {
        self.ensure_free(draft.slot())?;
        let task = Task { id: self.next_id(), ..draft };
        if let Some(slot) = task.slot() {
            self.schedule.add(slot);
        }
        self.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    /// Create an epic. Status, time window and subtask set on the draft are
    /// ignored; a fresh epic starts New and empty.
    pub fn create_epic(&mut self, draft: Epic) -> Result<Epic, StoreError> {
        let epic = Epic {
            id: self.next_id(),
            ..Epic::new(draft.name, draft.description)
        };
        self.epics.insert(epic.id, epic.clone());
        Ok(epic)
    }

    /// Create a subtask under its epic and refresh the epic's derived state.
    pub fn create_subtask(&mut self, draft: Subtask) -> Result<Subtask, StoreError> {
        if !self.epics.contains_key(&draft.epic_id) {
            return Err(StoreError::ParentNotFound(draft.epic_id));
        }
        self.ensure_free(draft.slot())?;
        let subtask = Subtask { id: self.next_id(), ..draft };
        if let Some(slot) = subtask.slot() {
            self.schedule.add(slot);
        }
        if let Some(epic) = self.epics.get_mut(&subtask.epic_id) {
            epic.subtask_ids.push(subtask.id);
        }
        self.subtasks.insert(subtask.id, subtask.clone());
        self.refresh_epic(subtask.epic_id);
        Ok(subtask)
    }

    /// Fetch a task, recording the view. The history entry and the returned
    /// value are independent copies of the stored record.
    pub fn get_task(&mut self, id: TaskId) -> Option<Task> {
        let task = self.tasks.get(&id)?.clone();
        self.history.record(Entity::Task(task.clone()));
        Some(task)
    }

    pub fn get_epic(&mut self, id: TaskId) -> Option<Epic> {
        let epic = self.epics.get(&id)?.clone();
        self.history.record(Entity::Epic(epic.clone()));
        Some(epic)
    }

    pub fn get_subtask(&mut self, id: TaskId) -> Option<Subtask> {
        let subtask = self.subtasks.get(&id)?.clone();
        self.history.record(Entity::Subtask(subtask.clone()));
        Some(subtask)
    }

    /// All tasks, ascending id.
    pub fn get_all_tasks(&self) -> Vec<Task> {
        let mut all: Vec<Task> = self.tasks.values().cloned().collect();
        all.sort_by_key(|task| task.id);
        all
    }

    pub fn get_all_epics(&self) -> Vec<Epic> {
        let mut all: Vec<Epic> = self.epics.values().cloned().collect();
        all.sort_by_key(|epic| epic.id);
        all
    }

    pub fn get_all_subtasks(&self) -> Vec<Subtask> {
        let mut all: Vec<Subtask> = self.subtasks.values().cloned().collect();
        all.sort_by_key(|subtask| subtask.id);
        all
    }

    /// Replace a stored task. On a scheduling conflict the old interval is
    /// restored and the store is unchanged.
    pub fn update_task(&mut self, task: Task) -> Result<Task, StoreError> {
        let old_slot = self
            .tasks
            .get(&task.id)
            .ok_or(StoreError::NotFound(task.id))?
            .slot();
        self.reschedule(old_slot, task.slot())?;
        self.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    /// Rename or re-describe an epic. Status and time window stay derived;
    /// whatever the caller put in those fields is discarded.
    pub fn update_epic(&mut self, epic: Epic) -> Result<Epic, StoreError> {
        let stored = self.epics.get_mut(&epic.id).ok_or(StoreError::NotFound(epic.id))?;
        stored.name = epic.name;
        stored.description = epic.description;
        Ok(stored.clone())
    }

    /// Replace a stored subtask and refresh its epic. The owning epic cannot
    /// change.
    pub fn update_subtask(&mut self, subtask: Subtask) -> Result<Subtask, StoreError> {
        let stored = self
            .subtasks
            .get(&subtask.id)
            .ok_or(StoreError::NotFound(subtask.id))?;
        if stored.epic_id != subtask.epic_id {
            return Err(StoreError::ParentMismatch {
                expected: stored.epic_id,
                got: subtask.epic_id,
            });
        }
        let old_slot = stored.slot();
        self.reschedule(old_slot, subtask.slot())?;
        self.subtasks.insert(subtask.id, subtask.clone());
        self.refresh_epic(subtask.epic_id);
        Ok(subtask)
    }

    /// Remove a task from the store and both indices.
    pub fn delete_task(&mut self, id: TaskId) -> Result<Task, StoreError> {
        let task = self.tasks.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(slot) = task.slot() {
            self.schedule.remove(&slot);
        }
        self.history.forget(id);
        Ok(task)
    }

    /// Remove an epic and cascade to all its subtasks.
    pub fn delete_epic(&mut self, id: TaskId) -> Result<Epic, StoreError> {
        let epic = self.epics.remove(&id).ok_or(StoreError::NotFound(id))?;
        for subtask_id in &epic.subtask_ids {
            if let Some(subtask) = self.subtasks.remove(subtask_id) {
                if let Some(slot) = subtask.slot() {
                    self.schedule.remove(&slot);
                }
                self.history.forget(*subtask_id);
            }
        }
        self.history.forget(id);
        Ok(epic)
    }

    /// Remove a subtask and refresh its former epic.
    pub fn delete_subtask(&mut self, id: TaskId) -> Result<Subtask, StoreError> {
        let subtask = self.subtasks.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(slot) = subtask.slot() {
            self.schedule.remove(&slot);
        }
        self.history.forget(id);
        if let Some(epic) = self.epics.get_mut(&subtask.epic_id) {
            epic.subtask_ids.retain(|sid| *sid != id);
        }
        self.refresh_epic(subtask.epic_id);
        Ok(subtask)
    }

    /// Remove every task, with the same index cleanup as single deletes.
    pub fn delete_all_tasks(&mut self) {
        for task in self.tasks.values() {
            if let Some(slot) = task.slot() {
                self.schedule.remove(&slot);
            }
        }
        self.history.forget_all(self.tasks.keys().copied());
        self.tasks.clear();
    }

    /// Remove every epic and, with them, every subtask.
    pub fn delete_all_epics(&mut self) {
        for subtask in self.subtasks.values() {
            if let Some(slot) = subtask.slot() {
                self.schedule.remove(&slot);
            }
        }
        self.history.forget_all(self.subtasks.keys().copied());
        self.history.forget_all(self.epics.keys().copied());
        self.subtasks.clear();
        self.epics.clear();
    }

    /// Remove every subtask; every epic drops back to New with no window.
    pub fn delete_all_subtasks(&mut self) {
        for subtask in self.subtasks.values() {
            if let Some(slot) = subtask.slot() {
                self.schedule.remove(&slot);
            }
        }
        self.history.forget_all(self.subtasks.keys().copied());
        self.subtasks.clear();

        let epic_ids: Vec<TaskId> = self.epics.keys().copied().collect();
        for id in epic_ids {
            if let Some(epic) = self.epics.get_mut(&id) {
                epic.subtask_ids.clear();
            }
            self.refresh_epic(id);
        }
    }

    /// The subtasks of an epic, in the epic's insertion order.
    pub fn epic_subtasks(&self, epic_id: TaskId) -> Result<Vec<Subtask>, StoreError> {
        let epic = self.epics.get(&epic_id).ok_or(StoreError::NotFound(epic_id))?;
        Ok(epic
            .subtask_ids
            .iter()
            .filter_map(|id| self.subtasks.get(id))
            .cloned()
            .collect())
    }

    /// Recently viewed entities, oldest first, each id at most once.
    pub fn history(&self) -> Vec<Entity> {
        self.history.snapshot()
    }

    /// All scheduled items ordered by start time. Epics never appear.
    pub fn prioritized(&self) -> Vec<Entity> {
        self.schedule
            .ordered_ids()
            .into_iter()
            .filter_map(|id| {
                self.tasks
                    .get(&id)
                    .map(|task| Entity::Task(task.clone()))
                    .or_else(|| self.subtasks.get(&id).map(|sub| Entity::Subtask(sub.clone())))
            })
            .collect()
    }

    fn ensure_free(&self, slot: Option<Slot>) -> Result<(), StoreError> {
        match slot {
            Some(slot) if !self.schedule.is_free(&slot) => Err(StoreError::SchedulingConflict),
            _ => Ok(()),
        }
    }

    /// Swap an item's indexed interval. On conflict the old interval is
    /// re-added and Err returned, so the index never loses state.
    fn reschedule(&mut self, old: Option<Slot>, new: Option<Slot>) -> Result<(), StoreError> {
        if let Some(slot) = old {
            self.schedule.remove(&slot);
        }
        match new {
            Some(slot) if !self.schedule.is_free(&slot) => {
                if let Some(slot) = old {
                    self.schedule.add(slot);
                }
                Err(StoreError::SchedulingConflict)
            }
            Some(slot) => {
                self.schedule.add(slot);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Recompute an epic's status and time window from its current subtasks.
    ///
    /// Status: New when the set is empty or all-New, Done when all-Done,
    /// InProgress otherwise. Start is the earliest subtask start, end the
    /// latest subtask end, duration the sum of subtask durations; each is
    /// absent when no subtask carries the field.
    fn refresh_epic(&mut self, epic_id: TaskId) {
        let Some(ids) = self.epics.get(&epic_id).map(|epic| epic.subtask_ids.clone()) else {
            return;
        };
        let subs: Vec<&Subtask> = ids.iter().filter_map(|id| self.subtasks.get(id)).collect();

        let status = if subs.is_empty() || subs.iter().all(|s| s.status == Status::New) {
            Status::New
        } else if subs.iter().all(|s| s.status == Status::Done) {
            Status::Done
        } else {
            Status::InProgress
        };
        let start_time = subs.iter().filter_map(|s| s.start_time).min();
        let end_time = subs.iter().filter_map(|s| s.end_time()).max();
        let duration_minutes = subs
            .iter()
            .filter_map(|s| s.duration_minutes)
            .fold(None, |total: Option<u32>, d| Some(total.unwrap_or(0) + d));

        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.status = status;
            epic.start_time = start_time;
            epic.end_time = end_time;
            epic.duration_minutes = duration_minutes;
        }
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
