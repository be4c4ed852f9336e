use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DependencyKind, PriorityKind, StatusKind, Task, TaskChanges};

/// Input DTO for creating a task.
///
/// ## Example
/// ```json
/// {
///   "project_id": "6f2c...",
///   "parent_id": "91ab...",
///   "name": "Design review",
///   "planned_start_date": "2026-09-01",
///   "planned_end_date": "2026-09-05",
///   "predecessors": ["4be0..."]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaskDto {
    pub project_id: Uuid,

    /// Task this one is nested under. Omit for a root (level 0) task.
    pub parent_id: Option<Uuid>,

    /// Explicit hierarchy level. Honored only when `parent_id` is set;
    /// computed as parent level + 1 otherwise. Root tasks are always level 0.
    pub level: Option<i32>,

    /// Human-readable name. Must be non-empty, max 300 characters.
    pub name: String,
    pub description: Option<String>,

    /// Planned schedule window. Start must be strictly before end when both
    /// are present.
    pub planned_start_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,

    /// Estimated effort in hours. Must be >= 0. Defaults to 0.
    pub estimated_hours: Option<i32>,

    pub priority: Option<PriorityKind>,
    pub category: Option<String>,
    pub is_milestone: Option<bool>,

    /// Tasks this one depends on. One finish-to-start edge with zero lag is
    /// created per entry; if any edge is rejected (cycle, duplicate, ...) the
    /// whole task creation rolls back.
    pub predecessors: Option<Vec<Uuid>>,
}

/// Partial update for an existing task. Omitted fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub planned_start_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub estimated_hours: Option<i32>,
    pub actual_hours: Option<i32>,

    /// Manually entered progress, 0..=100. Setting this triggers roll-up
    /// propagation through the task's ancestor chain.
    pub progress_rate: Option<i32>,

    pub priority: Option<PriorityKind>,
    pub status: Option<StatusKind>,
    pub category: Option<String>,
    pub is_milestone: Option<bool>,
    pub sort_order: Option<i32>,
}

impl UpdateTaskDto {
    pub fn is_empty(&self) -> bool {
        self.clone().into_changes().is_empty()
    }

    /// Translate into a store changeset. Hierarchy fields (`parent_id`,
    /// `level`) are deliberately absent; they only move via `set_parent`.
    pub fn into_changes(self) -> TaskChanges {
        TaskChanges {
            parent_id: None,
            level: None,
            name: self.name,
            description: self.description,
            planned_start_date: self.planned_start_date,
            planned_end_date: self.planned_end_date,
            actual_start_date: self.actual_start_date,
            actual_end_date: self.actual_end_date,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            progress_rate: self.progress_rate,
            priority: self.priority,
            status: self.status,
            is_milestone: self.is_milestone,
            category: self.category,
            sort_order: self.sort_order,
        }
    }
}

/// Input DTO for creating a dependency edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDependencyDto {
    pub predecessor_id: Uuid,
    pub successor_id: Uuid,
    /// Defaults to finish-to-start.
    pub kind: Option<DependencyKind>,
    /// Signed day offset. Defaults to 0.
    pub lag_days: Option<i32>,
}

/// One node of the read-only task tree returned by `task_tree`.
/// Children are materialized in `sort_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: Uuid,
    pub name: String,
    pub level: i32,
    pub parent_id: Option<Uuid>,
    pub status: StatusKind,
    pub progress_rate: i32,
    pub is_milestone: bool,
    pub sort_order: i32,
    pub subtasks: Vec<TaskNode>,
}

impl TaskNode {
    pub(crate) fn from_task(task: &Task, subtasks: Vec<TaskNode>) -> Self {
        TaskNode {
            id: task.id,
            name: task.name.clone(),
            level: task.level,
            parent_id: task.parent_id,
            status: task.status,
            progress_rate: task.progress_rate,
            is_milestone: task.is_milestone,
            sort_order: task.sort_order,
            subtasks,
        }
    }
}
