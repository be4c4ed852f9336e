//! Persistence abstractions for tasks and dependency edges.
//!
//! The engine is handed a concrete store at construction and never reaches
//! for ambient/global state. Two backends ship with the crate: `pg::PgStore`
//! (diesel-async against Postgres) and `memory::MemStore` (map-backed, for
//! tests and embedding).

pub mod memory;
pub mod pg;

use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{Dependency, NewDependency, NewTask, Task, TaskChanges};

pub use memory::MemStore;
pub use pg::PgStore;

/// Optional predicates for [`TaskStore::list`]. An empty filter matches every
/// task of the project.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub status: Option<crate::models::StatusKind>,
    pub level: Option<i32>,
}

impl TaskFilter {
    pub fn level(level: i32) -> Self {
        TaskFilter {
            level: Some(level),
            ..Default::default()
        }
    }
}

/// Task persistence. All queries are scoped to a single project; handing back
/// rows from another project is a programming error in the backend, not a
/// recoverable condition.
pub trait TaskStore {
    /// `Ok(None)` is "not found", which is distinct from an empty list result.
    async fn get(&mut self, id: Uuid) -> EngineResult<Option<Task>>;

    /// Tasks of a project matching `filter`, ordered by (`sort_order`, `id`).
    async fn list(&mut self, project_id: Uuid, filter: TaskFilter) -> EngineResult<Vec<Task>>;

    /// Immediate children of a task, ordered by (`sort_order`, `id`).
    async fn children(&mut self, parent_id: Uuid) -> EngineResult<Vec<Task>>;

    async fn insert(&mut self, task: NewTask) -> EngineResult<Task>;

    async fn update(&mut self, id: Uuid, changes: TaskChanges) -> EngineResult<Task>;

    /// Returns whether a row was actually deleted.
    async fn delete(&mut self, id: Uuid) -> EngineResult<bool>;

    /// Highest `sort_order` in the project, 0 when the project has no tasks.
    async fn max_sort_order(&mut self, project_id: Uuid) -> EngineResult<i32>;

    async fn project_exists(&mut self, project_id: Uuid) -> EngineResult<bool>;
}

/// Dependency-edge persistence.
pub trait DependencyStore {
    /// Outgoing edges: `task_id` is the predecessor.
    async fn edges_from(&mut self, task_id: Uuid) -> EngineResult<Vec<Dependency>>;

    /// Incoming edges: `task_id` is the successor.
    async fn edges_into(&mut self, task_id: Uuid) -> EngineResult<Vec<Dependency>>;

    async fn get_edge(
        &mut self,
        predecessor_id: Uuid,
        successor_id: Uuid,
    ) -> EngineResult<Option<Dependency>>;

    async fn insert_edge(&mut self, edge: NewDependency) -> EngineResult<Dependency>;

    /// Returns whether an edge was actually deleted.
    async fn delete_edge(&mut self, predecessor_id: Uuid, successor_id: Uuid)
    -> EngineResult<bool>;

    /// Drops every edge touching the task, in either direction. Returns the
    /// number of edges removed.
    async fn delete_edges_for_task(&mut self, task_id: Uuid) -> EngineResult<usize>;

    /// Every edge whose endpoints belong to the project.
    async fn edges_for_project(&mut self, project_id: Uuid) -> EngineResult<Vec<Dependency>>;
}

/// A complete storage backend: both stores plus transaction control.
///
/// `begin`/`commit`/`rollback` bracket every mutating engine operation, so a
/// cycle check and the edge insert it guards are one atomic unit.
/// `lock_project` serializes concurrent mutations of one project's hierarchy
/// and graph for the duration of the current transaction.
pub trait Store: TaskStore + DependencyStore {
    async fn begin(&mut self) -> EngineResult<()>;

    async fn commit(&mut self) -> EngineResult<()>;

    async fn rollback(&mut self) -> EngineResult<()>;

    async fn lock_project(&mut self, project_id: Uuid) -> EngineResult<()>;
}
