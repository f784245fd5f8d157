//! Core data types for the Slate task tracker.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the store. 0 marks a draft that has not been stored.
pub type TaskId = u32;

/// Progress state of a task or subtask. Epics carry one too, but theirs is
/// always derived from their subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    New,
    InProgress,
    Done,
}

/// Which of the three record shapes an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Task,
    Epic,
    Subtask,
}

/// A plain unit of work with no children.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Store-assigned identifier, never client-supplied.
    #[serde(default)]
    pub id: TaskId,

    /// Short description of the work
    pub name: String,

    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Current state
    pub status: Status,

    /// When work is planned to begin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// Planned length of the work in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl Task {
    /// Build an unstored draft. The store assigns the id on create.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        status: Status,
        start_time: Option<DateTime<Utc>>,
        duration_minutes: Option<u32>,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description,
            status,
            start_time,
            duration_minutes,
        }
    }

    /// End of the planned period, when both start and duration are set.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        end_of(self.start_time, self.duration_minutes)
    }

    /// True when both start and duration are set.
    pub fn is_scheduled(&self) -> bool {
        self.start_time.is_some() && self.duration_minutes.is_some()
    }

    /// The scheduling interval, if this task is scheduled.
    pub fn slot(&self) -> Option<Slot> {
        Slot::build(self.id, self.start_time, self.duration_minutes)
    }
}

/// A container of subtasks. Status and time window are derived, never set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Epic {
    #[serde(default)]
    pub id: TaskId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Derived: New if no subtask has started, Done if all are done,
    /// InProgress otherwise.
    #[serde(default = "Epic::default_status")]
    pub status: Status,

    /// Derived: earliest subtask start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// Derived: latest subtask end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Derived: sum of subtask durations, absent when no subtask has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,

    /// Ids of owned subtasks, in insertion order, no duplicates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtask_ids: Vec<TaskId>,
}

impl Epic {
    /// Build an unstored draft with no subtasks and no time window.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description,
            status: Status::New,
            start_time: None,
            end_time: None,
            duration_minutes: None,
            subtask_ids: Vec::new(),
        }
    }

    fn default_status() -> Status {
        Status::New
    }
}

/// A unit of work owned by exactly one epic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subtask {
    #[serde(default)]
    pub id: TaskId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: Status,

    /// Owning epic. Fixed at creation; updates that change it are rejected.
    pub epic_id: TaskId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl Subtask {
    /// Build an unstored draft under the given epic.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        status: Status,
        epic_id: TaskId,
        start_time: Option<DateTime<Utc>>,
        duration_minutes: Option<u32>,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description,
            status,
            epic_id,
            start_time,
            duration_minutes,
        }
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        end_of(self.start_time, self.duration_minutes)
    }

    pub fn is_scheduled(&self) -> bool {
        self.start_time.is_some() && self.duration_minutes.is_some()
    }

    pub fn slot(&self) -> Option<Slot> {
        Slot::build(self.id, self.start_time, self.duration_minutes)
    }
}

/// Any of the three record shapes, dispatched by kind.
///
/// History snapshots, the prioritized view, and the wire protocol all carry
/// mixed kinds, so they traffic in this type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Task(Task),
    Epic(Epic),
    Subtask(Subtask),
}

impl Entity {
    pub fn id(&self) -> TaskId {
        match self {
            Entity::Task(t) => t.id,
            Entity::Epic(e) => e.id,
            Entity::Subtask(s) => s.id,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Entity::Task(_) => Kind::Task,
            Entity::Epic(_) => Kind::Epic,
            Entity::Subtask(_) => Kind::Subtask,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Task(t) => &t.name,
            Entity::Epic(e) => &e.name,
            Entity::Subtask(s) => &s.name,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Entity::Task(t) => t.status,
            Entity::Epic(e) => e.status,
            Entity::Subtask(s) => s.status,
        }
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Entity::Task(t) => t.start_time,
            Entity::Epic(e) => e.start_time,
            Entity::Subtask(s) => s.start_time,
        }
    }

    pub fn duration_minutes(&self) -> Option<u32> {
        match self {
            Entity::Task(t) => t.duration_minutes,
            Entity::Epic(e) => e.duration_minutes,
            Entity::Subtask(s) => s.duration_minutes,
        }
    }
}

/// The half-open scheduling interval `[start, end)` of a scheduled item.
///
/// Epics never have slots; their time window is derived, not scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub id: TaskId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    fn build(id: TaskId, start: Option<DateTime<Utc>>, minutes: Option<u32>) -> Option<Self> {
        let (start, minutes) = (start?, minutes?);
        Some(Self {
            id,
            start,
            end: start + TimeDelta::minutes(i64::from(minutes)),
        })
    }

    /// Half-open interval intersection: touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }
}

fn end_of(start: Option<DateTime<Utc>>, minutes: Option<u32>) -> Option<DateTime<Utc>> {
    Some(start? + TimeDelta::minutes(i64::from(minutes?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        format!("2025-02-18T{hour:02}:{minute:02}:00Z").parse().unwrap()
    }

    fn scheduled(id: TaskId, hour: u32, minute: u32, minutes: u32) -> Slot {
        Task {
            id,
            ..Task::new("t", None, Status::New, Some(at(hour, minute)), Some(minutes))
        }
        .slot()
        .unwrap()
    }

    #[test]
    fn test_is_scheduled_requires_both_fields() {
        let both = Task::new("a", None, Status::New, Some(at(10, 0)), Some(30));
        let start_only = Task::new("b", None, Status::New, Some(at(10, 0)), None);
        let duration_only = Task::new("c", None, Status::New, None, Some(30));
        let neither = Task::new("d", None, Status::New, None, None);

        assert!(both.is_scheduled());
        assert!(!start_only.is_scheduled());
        assert!(!duration_only.is_scheduled());
        assert!(!neither.is_scheduled());
        assert!(start_only.slot().is_none());
        assert!(start_only.end_time().is_none());
    }

    #[test]
    fn test_end_time() {
        let task = Task::new("a", None, Status::New, Some(at(10, 0)), Some(40));
        assert_eq!(task.end_time(), Some(at(10, 40)));
    }

    #[test]
    fn test_overlap_partial() {
        // [10:00, 10:40) vs [10:30, 10:50)
        assert!(scheduled(1, 10, 0, 40).overlaps(&scheduled(2, 10, 30, 20)));
    }

    #[test]
    fn test_overlap_containment() {
        // [10:00, 11:00) contains [10:15, 10:30)
        assert!(scheduled(1, 10, 0, 60).overlaps(&scheduled(2, 10, 15, 15)));
    }

    #[test]
    fn test_touching_endpoints_do_not_overlap() {
        // [10:00, 10:40) then [10:40, 11:00)
        assert!(!scheduled(1, 10, 0, 40).overlaps(&scheduled(2, 10, 40, 20)));
    }

    #[test]
    fn test_disjoint_do_not_overlap() {
        assert!(!scheduled(1, 10, 0, 30).overlaps(&scheduled(2, 12, 0, 30)));
    }

    #[test]
    fn test_zero_duration_slot_never_overlaps() {
        // An empty interval intersects nothing, even inside another period.
        assert!(!scheduled(1, 10, 15, 0).overlaps(&scheduled(2, 10, 0, 60)));
        assert!(!scheduled(2, 10, 0, 60).overlaps(&scheduled(1, 10, 15, 0)));
    }

    #[test]
    fn test_new_epic_has_no_window() {
        let epic = Epic::new("Release", None);
        assert_eq!(epic.status, Status::New);
        assert!(epic.start_time.is_none());
        assert!(epic.end_time.is_none());
        assert!(epic.duration_minutes.is_none());
        assert!(epic.subtask_ids.is_empty());
    }

    #[test]
    fn test_entity_accessors() {
        let task = Task::new("a", None, Status::InProgress, Some(at(9, 0)), Some(15));
        let entity = Entity::Task(task.clone());
        assert_eq!(entity.kind(), Kind::Task);
        assert_eq!(entity.status(), Status::InProgress);
        assert_eq!(entity.start_time(), task.start_time);
        assert_eq!(entity.duration_minutes(), Some(15));
        assert_eq!(entity.name(), "a");
    }

    #[test]
    fn test_entity_serialization_roundtrip() {
        let sub = Subtask::new("s", Some("d".into()), Status::New, 7, Some(at(13, 15)), Some(60));
        let entity = Entity::Subtask(sub);
        let json = serde_json::to_string(&entity).unwrap();
        assert!(json.contains("\"kind\":\"subtask\""));
        let parsed: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(entity, parsed);
    }

    #[test]
    fn test_task_deserializes_without_id() {
        // Drafts posted over the wire omit the id; it defaults to 0.
        let task: Task = serde_json::from_str(r#"{"name":"t","status":"new"}"#).unwrap();
        assert_eq!(task.id, 0);
        assert!(!task.is_scheduled());
    }
}
