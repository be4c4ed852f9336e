use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node in a project's task forest.
///
/// `parent_id` records which task contains this one; `level` is the depth in
/// the tree (0 = root) and always equals the parent's level + 1. The store,
/// not the record, is the source of truth for tree edges.
#[derive(Identifiable, Queryable, Selectable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::task)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub name: String,
    pub description: Option<String>,
    pub planned_start_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub estimated_hours: i32,
    pub actual_hours: i32,
    /// 0..=100. For tasks with children this is the rolled-up value; for leaf
    /// tasks it is the manually entered value and is never overwritten by
    /// propagation.
    pub progress_rate: i32,
    pub priority: PriorityKind,
    pub status: StatusKind,
    pub is_milestone: bool,
    pub category: Option<String>,
    /// Sibling display order within the project, assigned as max + 1 on
    /// creation.
    pub sort_order: i32,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// A directed dependency edge `predecessor -> successor` between two tasks of
/// the same project. The edge set over task ids must stay acyclic.
#[derive(Identifiable, Queryable, Selectable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::dependency)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Dependency {
    pub id: Uuid,
    pub predecessor_id: Uuid,
    pub successor_id: Uuid,
    pub kind: DependencyKind,
    /// Signed day offset on the timing constraint. Stored only; no scheduling
    /// pass computes on it.
    pub lag_days: i32,
    pub created_at: chrono::DateTime<Utc>,
}

/// Insertable task row. `id`, `created_at` and `updated_at` are assigned by
/// the store.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::task)]
pub struct NewTask {
    pub project_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub name: String,
    pub description: Option<String>,
    pub planned_start_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub estimated_hours: i32,
    pub progress_rate: i32,
    pub priority: PriorityKind,
    pub status: StatusKind,
    pub is_milestone: bool,
    pub category: Option<String>,
    pub sort_order: i32,
}

/// Insertable dependency edge.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::dependency)]
pub struct NewDependency {
    pub predecessor_id: Uuid,
    pub successor_id: Uuid,
    pub kind: DependencyKind,
    pub lag_days: i32,
}

/// Partial update for a task row. `None` fields are left untouched;
/// `parent_id: Some(None)` detaches the task from its parent.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = crate::schema::task)]
pub struct TaskChanges {
    pub parent_id: Option<Option<Uuid>>,
    pub level: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub planned_start_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub estimated_hours: Option<i32>,
    pub actual_hours: Option<i32>,
    pub progress_rate: Option<i32>,
    pub priority: Option<PriorityKind>,
    pub status: Option<StatusKind>,
    pub is_milestone: Option<bool>,
    pub category: Option<String>,
    pub sort_order: Option<i32>,
}

impl TaskChanges {
    /// Changeset writing only the rolled-up progress value.
    pub fn progress(progress_rate: i32) -> Self {
        TaskChanges {
            progress_rate: Some(progress_rate),
            ..Default::default()
        }
    }

    /// Changeset moving a task to a new parent at a new level.
    pub fn position(parent_id: Option<Uuid>, level: i32) -> Self {
        TaskChanges {
            parent_id: Some(parent_id),
            level: Some(level),
            ..Default::default()
        }
    }

    /// Changeset re-leveling a task in place.
    pub fn level(level: i32) -> Self {
        TaskChanges {
            level: Some(level),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parent_id.is_none()
            && self.level.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.planned_start_date.is_none()
            && self.planned_end_date.is_none()
            && self.actual_start_date.is_none()
            && self.actual_end_date.is_none()
            && self.estimated_hours.is_none()
            && self.actual_hours.is_none()
            && self.progress_rate.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.is_milestone.is_none()
            && self.category.is_none()
            && self.sort_order.is_none()
    }
}

#[derive(Debug, PartialEq, Serialize, diesel_derive_enum::DbEnum, Deserialize, Clone, Copy)]
#[db_enum(existing_type_path = "crate::schema::sql_types::StatusKind")]
pub enum StatusKind {
    NotStarted,
    InProgress,
    Completed,
    OnHold,
}

#[derive(Debug, PartialEq, Serialize, diesel_derive_enum::DbEnum, Deserialize, Clone, Copy)]
#[db_enum(existing_type_path = "crate::schema::sql_types::PriorityKind")]
pub enum PriorityKind {
    High,
    Medium,
    Low,
}

#[derive(Debug, PartialEq, Serialize, diesel_derive_enum::DbEnum, Deserialize, Clone, Copy)]
#[db_enum(existing_type_path = "crate::schema::sql_types::DependencyKind")]
pub enum DependencyKind {
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}
