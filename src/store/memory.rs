//! Map-backed store used by the test suite and embeddable by consumers that
//! want to exercise engine logic without a database.
//!
//! Transactions are snapshot/restore: `begin` clones the current state,
//! `rollback` swaps it back. `lock_project` is a no-op: the store is `&mut`
//! for every operation, so access is already serialized.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{Dependency, NewDependency, NewTask, Task, TaskChanges};
use crate::store::{DependencyStore, Store, TaskFilter, TaskStore};

#[derive(Debug, Clone, Default)]
struct State {
    projects: BTreeSet<Uuid>,
    tasks: BTreeMap<Uuid, Task>,
    edges: BTreeMap<(Uuid, Uuid), Dependency>,
}

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct MemStore {
    state: State,
    snapshot: Option<State>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }

    /// Registers a project id so `project_exists` reports it. Projects are
    /// managed outside this crate; tests seed them here.
    pub fn add_project(&mut self, project_id: Uuid) {
        self.state.projects.insert(project_id);
    }
}

fn by_sort_order(tasks: &mut Vec<Task>) {
    tasks.sort_by(|a, b| (a.sort_order, a.id).cmp(&(b.sort_order, b.id)));
}

fn apply_changes(task: &mut Task, changes: TaskChanges) {
    if let Some(parent_id) = changes.parent_id {
        task.parent_id = parent_id;
    }
    if let Some(level) = changes.level {
        task.level = level;
    }
    if let Some(name) = changes.name {
        task.name = name;
    }
    if let Some(description) = changes.description {
        task.description = Some(description);
    }
    if let Some(d) = changes.planned_start_date {
        task.planned_start_date = Some(d);
    }
    if let Some(d) = changes.planned_end_date {
        task.planned_end_date = Some(d);
    }
    if let Some(d) = changes.actual_start_date {
        task.actual_start_date = Some(d);
    }
    if let Some(d) = changes.actual_end_date {
        task.actual_end_date = Some(d);
    }
    if let Some(hours) = changes.estimated_hours {
        task.estimated_hours = hours;
    }
    if let Some(hours) = changes.actual_hours {
        task.actual_hours = hours;
    }
    if let Some(rate) = changes.progress_rate {
        task.progress_rate = rate;
    }
    if let Some(priority) = changes.priority {
        task.priority = priority;
    }
    if let Some(status) = changes.status {
        task.status = status;
    }
    if let Some(flag) = changes.is_milestone {
        task.is_milestone = flag;
    }
    if let Some(category) = changes.category {
        task.category = Some(category);
    }
    if let Some(sort_order) = changes.sort_order {
        task.sort_order = sort_order;
    }
    task.updated_at = Utc::now();
}

impl TaskStore for MemStore {
    async fn get(&mut self, id: Uuid) -> EngineResult<Option<Task>> {
        Ok(self.state.tasks.get(&id).cloned())
    }

    async fn list(&mut self, project_id: Uuid, filter: TaskFilter) -> EngineResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .state
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| filter.level.is_none_or(|l| t.level == l))
            .cloned()
            .collect();
        by_sort_order(&mut tasks);
        Ok(tasks)
    }

    async fn children(&mut self, parent_id: Uuid) -> EngineResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .state
            .tasks
            .values()
            .filter(|t| t.parent_id == Some(parent_id))
            .cloned()
            .collect();
        by_sort_order(&mut tasks);
        Ok(tasks)
    }

    async fn insert(&mut self, task: NewTask) -> EngineResult<Task> {
        let now = Utc::now();
        let row = Task {
            id: Uuid::new_v4(),
            project_id: task.project_id,
            parent_id: task.parent_id,
            level: task.level,
            name: task.name,
            description: task.description,
            planned_start_date: task.planned_start_date,
            planned_end_date: task.planned_end_date,
            actual_start_date: None,
            actual_end_date: None,
            estimated_hours: task.estimated_hours,
            actual_hours: 0,
            progress_rate: task.progress_rate,
            priority: task.priority,
            status: task.status,
            is_milestone: task.is_milestone,
            category: task.category,
            sort_order: task.sort_order,
            created_at: now,
            updated_at: now,
        };
        self.state.tasks.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&mut self, id: Uuid, changes: TaskChanges) -> EngineResult<Task> {
        let task = self
            .state
            .tasks
            .get_mut(&id)
            .ok_or(EngineError::TaskNotFound(id))?;
        apply_changes(task, changes);
        Ok(task.clone())
    }

    async fn delete(&mut self, id: Uuid) -> EngineResult<bool> {
        Ok(self.state.tasks.remove(&id).is_some())
    }

    async fn max_sort_order(&mut self, project_id: Uuid) -> EngineResult<i32> {
        Ok(self
            .state
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .map(|t| t.sort_order)
            .max()
            .unwrap_or(0))
    }

    async fn project_exists(&mut self, project_id: Uuid) -> EngineResult<bool> {
        Ok(self.state.projects.contains(&project_id))
    }
}

impl DependencyStore for MemStore {
    async fn edges_from(&mut self, task_id: Uuid) -> EngineResult<Vec<Dependency>> {
        Ok(self
            .state
            .edges
            .values()
            .filter(|e| e.predecessor_id == task_id)
            .cloned()
            .collect())
    }

    async fn edges_into(&mut self, task_id: Uuid) -> EngineResult<Vec<Dependency>> {
        Ok(self
            .state
            .edges
            .values()
            .filter(|e| e.successor_id == task_id)
            .cloned()
            .collect())
    }

    async fn get_edge(
        &mut self,
        predecessor_id: Uuid,
        successor_id: Uuid,
    ) -> EngineResult<Option<Dependency>> {
        Ok(self
            .state
            .edges
            .get(&(predecessor_id, successor_id))
            .cloned())
    }

    async fn insert_edge(&mut self, edge: NewDependency) -> EngineResult<Dependency> {
        let row = Dependency {
            id: Uuid::new_v4(),
            predecessor_id: edge.predecessor_id,
            successor_id: edge.successor_id,
            kind: edge.kind,
            lag_days: edge.lag_days,
            created_at: Utc::now(),
        };
        self.state
            .edges
            .insert((row.predecessor_id, row.successor_id), row.clone());
        Ok(row)
    }

    async fn delete_edge(
        &mut self,
        predecessor_id: Uuid,
        successor_id: Uuid,
    ) -> EngineResult<bool> {
        Ok(self
            .state
            .edges
            .remove(&(predecessor_id, successor_id))
            .is_some())
    }

    async fn delete_edges_for_task(&mut self, task_id: Uuid) -> EngineResult<usize> {
        let before = self.state.edges.len();
        self.state
            .edges
            .retain(|_, e| e.predecessor_id != task_id && e.successor_id != task_id);
        Ok(before - self.state.edges.len())
    }

    async fn edges_for_project(&mut self, project_id: Uuid) -> EngineResult<Vec<Dependency>> {
        let task_ids: BTreeSet<Uuid> = self
            .state
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .map(|t| t.id)
            .collect();
        Ok(self
            .state
            .edges
            .values()
            .filter(|e| task_ids.contains(&e.predecessor_id))
            .cloned()
            .collect())
    }
}

impl Store for MemStore {
    async fn begin(&mut self) -> EngineResult<()> {
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    async fn commit(&mut self) -> EngineResult<()> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(&mut self) -> EngineResult<()> {
        match self.snapshot.take() {
            Some(snapshot) => self.state = snapshot,
            None => log::warn!("rollback without an open transaction"),
        }
        Ok(())
    }

    async fn lock_project(&mut self, _project_id: Uuid) -> EngineResult<()> {
        Ok(())
    }
}
