//! Composition root for the task hierarchy and dependency engine.
//!
//! `TaskEngine` holds the storage backend (injected at construction) and
//! orchestrates the hierarchy and dependency-graph managers. Every mutating
//! operation runs inside one storage transaction, serialized per project via
//! the store's project lock, so a cycle check and the write it guards are a
//! single atomic unit. There is no partial success: `create_task` with
//! predecessors either persists the task and every edge, or nothing.

use uuid::Uuid;

use crate::dtos::{NewDependencyDto, NewTaskDto, TaskNode, UpdateTaskDto};
use crate::error::{EngineError, EngineResult};
use crate::graph;
use crate::hierarchy;
use crate::models::{
    Dependency, DependencyKind, NewTask, PriorityKind, StatusKind, Task, TaskChanges,
};
use crate::store::{Store, TaskFilter};
use crate::validation;

/// Tunable engine behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnginePolicy {
    /// When set, `create_edge` additionally requires the predecessor to be a
    /// member of the successor's valid-predecessor candidate set. Off by
    /// default: only same-project and acyclicity are hard requirements.
    pub strict_predecessors: bool,
}

/// The engine. Generic over the storage backend so the same logic runs
/// against Postgres in production and the in-memory store in tests.
pub struct TaskEngine<S: Store> {
    store: S,
    policy: EnginePolicy,
}

impl<S: Store> TaskEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, EnginePolicy::default())
    }

    pub fn with_policy(store: S, policy: EnginePolicy) -> Self {
        TaskEngine { store, policy }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Commit on success, roll back on failure, pass the outcome through.
    async fn finish<T>(&mut self, outcome: EngineResult<T>) -> EngineResult<T> {
        match outcome {
            Ok(value) => {
                self.store.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb_err) = self.store.rollback().await {
                    log::error!("Failed to rollback transaction: {}", rb_err);
                }
                Err(e)
            }
        }
    }

    /// Create a task, deriving its level from the parent and assigning the
    /// next `sort_order` in the project. Entries in `predecessors` become
    /// finish-to-start edges with zero lag; if any of them is rejected the
    /// whole creation rolls back.
    pub async fn create_task(&mut self, dto: NewTaskDto) -> EngineResult<Task> {
        validation::validate_new_task(&dto)?;
        self.store.begin().await?;
        let outcome = self.create_task_tx(dto).await;
        self.finish(outcome).await
    }

    async fn create_task_tx(&mut self, dto: NewTaskDto) -> EngineResult<Task> {
        self.store.lock_project(dto.project_id).await?;
        if !self.store.project_exists(dto.project_id).await? {
            return Err(EngineError::ProjectNotFound(dto.project_id));
        }

        let level = match dto.parent_id {
            Some(parent_id) => {
                let parent = self
                    .store
                    .get(parent_id)
                    .await?
                    .ok_or(EngineError::TaskNotFound(parent_id))?;
                if parent.project_id != dto.project_id {
                    return Err(EngineError::Validation(
                        "Parent task belongs to a different project".to_string(),
                    ));
                }
                hierarchy::compute_level(Some(&parent), dto.level)?
            }
            None => hierarchy::compute_level(None, dto.level)?,
        };

        let sort_order = self.store.max_sort_order(dto.project_id).await? + 1;
        let created = self
            .store
            .insert(NewTask {
                project_id: dto.project_id,
                parent_id: dto.parent_id,
                level,
                name: dto.name,
                description: dto.description,
                planned_start_date: dto.planned_start_date,
                planned_end_date: dto.planned_end_date,
                estimated_hours: dto.estimated_hours.unwrap_or(0),
                progress_rate: 0,
                priority: dto.priority.unwrap_or(PriorityKind::Medium),
                status: StatusKind::NotStarted,
                is_milestone: dto.is_milestone.unwrap_or(false),
                category: dto.category,
                sort_order,
            })
            .await?;

        for predecessor_id in dto.predecessors.unwrap_or_default() {
            let predecessor = self
                .store
                .get(predecessor_id)
                .await?
                .ok_or(EngineError::TaskNotFound(predecessor_id))?;
            graph::create_edge(
                &mut self.store,
                &predecessor,
                &created,
                DependencyKind::FinishToStart,
                0,
                self.policy.strict_predecessors,
            )
            .await?;
        }

        log::debug!(
            "created task {} (level {}) in project {}",
            created.id,
            created.level,
            created.project_id
        );
        Ok(created)
    }

    /// Apply a partial update. Date ordering and progress range are validated
    /// against the merged view before anything is written; a patch touching
    /// `progress_rate` triggers roll-up propagation through the ancestor
    /// chain.
    pub async fn update_task(&mut self, task_id: Uuid, dto: UpdateTaskDto) -> EngineResult<Task> {
        self.store.begin().await?;
        let outcome = self.update_task_tx(task_id, dto).await;
        self.finish(outcome).await
    }

    async fn update_task_tx(&mut self, task_id: Uuid, dto: UpdateTaskDto) -> EngineResult<Task> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or(EngineError::TaskNotFound(task_id))?;
        self.store.lock_project(task.project_id).await?;
        // Re-read under the lock: the merged date/progress validation must
        // run against a row no concurrent transaction can still change.
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or(EngineError::TaskNotFound(task_id))?;
        validation::validate_update(&task, &dto)?;

        let progress_touched = dto.progress_rate.is_some();
        let changes = dto.into_changes();
        let mut updated = if changes.is_empty() {
            task
        } else {
            self.store.update(task_id, changes).await?
        };

        if progress_touched {
            hierarchy::propagate_progress(&mut self.store, task_id).await?;
            updated = self
                .store
                .get(task_id)
                .await?
                .ok_or(EngineError::TaskNotFound(task_id))?;
        }

        Ok(updated)
    }

    /// Delete a leaf task together with its dependency edges. Blocked with
    /// `HasChildren` while subtasks exist.
    pub async fn delete_task(&mut self, task_id: Uuid) -> EngineResult<()> {
        self.store.begin().await?;
        let outcome = self.delete_task_tx(task_id).await;
        self.finish(outcome).await
    }

    async fn delete_task_tx(&mut self, task_id: Uuid) -> EngineResult<()> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or(EngineError::TaskNotFound(task_id))?;
        self.store.lock_project(task.project_id).await?;
        hierarchy::validate_deletion(&mut self.store, task_id).await?;

        let edges = self.store.delete_edges_for_task(task_id).await?;
        self.store.delete(task_id).await?;
        log::debug!("deleted task {} and {} dependency edges", task_id, edges);
        Ok(())
    }

    /// Move a task under a new parent (or detach it). Delegates to the
    /// hierarchy manager's reparent, which rejects ancestry cycles and
    /// cascade-recomputes descendant levels.
    pub async fn set_parent(
        &mut self,
        task_id: Uuid,
        new_parent_id: Option<Uuid>,
        level: Option<i32>,
    ) -> EngineResult<Task> {
        self.store.begin().await?;
        let outcome = self.set_parent_tx(task_id, new_parent_id, level).await;
        self.finish(outcome).await
    }

    async fn set_parent_tx(
        &mut self,
        task_id: Uuid,
        new_parent_id: Option<Uuid>,
        level: Option<i32>,
    ) -> EngineResult<Task> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or(EngineError::TaskNotFound(task_id))?;
        self.store.lock_project(task.project_id).await?;
        hierarchy::reparent(&mut self.store, task_id, new_parent_id, level).await
    }

    /// Create a dependency edge between two tasks of the same project.
    pub async fn create_edge(&mut self, dto: NewDependencyDto) -> EngineResult<Dependency> {
        self.store.begin().await?;
        let outcome = self.create_edge_tx(dto).await;
        self.finish(outcome).await
    }

    async fn create_edge_tx(&mut self, dto: NewDependencyDto) -> EngineResult<Dependency> {
        if dto.predecessor_id == dto.successor_id {
            return Err(EngineError::SelfDependency(dto.predecessor_id));
        }
        let predecessor = self
            .store
            .get(dto.predecessor_id)
            .await?
            .ok_or(EngineError::TaskNotFound(dto.predecessor_id))?;
        let successor = self
            .store
            .get(dto.successor_id)
            .await?
            .ok_or(EngineError::TaskNotFound(dto.successor_id))?;
        self.store.lock_project(successor.project_id).await?;

        graph::create_edge(
            &mut self.store,
            &predecessor,
            &successor,
            dto.kind.unwrap_or(DependencyKind::FinishToStart),
            dto.lag_days.unwrap_or(0),
            self.policy.strict_predecessors,
        )
        .await
    }

    /// Remove a dependency edge. The edge may be removed without removing
    /// either endpoint; a repeat call reports `DependencyNotFound`.
    pub async fn remove_edge(
        &mut self,
        predecessor_id: Uuid,
        successor_id: Uuid,
    ) -> EngineResult<()> {
        self.store.begin().await?;
        let outcome = graph::remove_edge(&mut self.store, predecessor_id, successor_id).await;
        self.finish(outcome).await
    }

    /// Advisory candidate list of tasks that may legally precede `task_id`,
    /// derived from its hierarchy position. Read-only.
    pub async fn valid_predecessors(&mut self, task_id: Uuid) -> EngineResult<Vec<Task>> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or(EngineError::TaskNotFound(task_id))?;
        graph::valid_predecessors(&mut self.store, &task).await
    }

    /// Read-only forest view of a project's tasks.
    pub async fn task_tree(&mut self, project_id: Uuid) -> EngineResult<Vec<TaskNode>> {
        if !self.store.project_exists(project_id).await? {
            return Err(EngineError::ProjectNotFound(project_id));
        }
        hierarchy::build_tree(&mut self.store, project_id).await
    }

    /// Every dependency edge of a project, for chart rendering.
    pub async fn project_dependencies(
        &mut self,
        project_id: Uuid,
    ) -> EngineResult<Vec<Dependency>> {
        if !self.store.project_exists(project_id).await? {
            return Err(EngineError::ProjectNotFound(project_id));
        }
        self.store.edges_for_project(project_id).await
    }

    /// Batch repair: reapply the roll-up formula to every nested task,
    /// deepest level first, and return the tasks whose stored value actually
    /// changed.
    pub async fn recompute_all_progress(&mut self, project_id: Uuid) -> EngineResult<Vec<Task>> {
        self.store.begin().await?;
        let outcome = self.recompute_all_progress_tx(project_id).await;
        self.finish(outcome).await
    }

    async fn recompute_all_progress_tx(&mut self, project_id: Uuid) -> EngineResult<Vec<Task>> {
        self.store.lock_project(project_id).await?;
        if !self.store.project_exists(project_id).await? {
            return Err(EngineError::ProjectNotFound(project_id));
        }

        let mut changed = Vec::new();
        // Only nested tasks are rewritten, deepest level first so a parent's
        // children are final before it rolls up. Level-0 roots keep their
        // stored value; they are maintained by per-update propagation.
        for level in (1..=hierarchy::MAX_LEVEL).rev() {
            for task in self
                .store
                .list(project_id, TaskFilter::level(level))
                .await?
            {
                let children = self.store.children(task.id).await?;
                if let Some(mean) = hierarchy::rollup(&children)
                    && mean != task.progress_rate
                {
                    changed.push(
                        self.store
                            .update(task.id, TaskChanges::progress(mean))
                            .await?,
                    );
                }
            }
        }
        Ok(changed)
    }

    pub async fn get_task(&mut self, task_id: Uuid) -> EngineResult<Task> {
        self.store
            .get(task_id)
            .await?
            .ok_or(EngineError::TaskNotFound(task_id))
    }

    pub async fn list_tasks(
        &mut self,
        project_id: Uuid,
        filter: TaskFilter,
    ) -> EngineResult<Vec<Task>> {
        if !self.store.project_exists(project_id).await? {
            return Err(EngineError::ProjectNotFound(project_id));
        }
        self.store.list(project_id, filter).await
    }
}
