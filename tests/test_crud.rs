mod common;
use common::*;

use chrono::NaiveDate;
use uuid::Uuid;

use gunchart_core::dtos::UpdateTaskDto;
use gunchart_core::engine::TaskEngine;
use gunchart_core::error::{DateKind, EngineError, EngineResult};
use gunchart_core::models::{
    Dependency, NewDependency, NewTask, PriorityKind, StatusKind, Task, TaskChanges,
};
use gunchart_core::store::{DependencyStore, MemStore, Store, TaskFilter, TaskStore};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_create_task_applies_defaults() {
    let (project, mut engine) = setup_engine();

    let task = engine.create_task(root_task(project, "Design")).await.unwrap();
    assert_eq!(task.progress_rate, 0);
    assert_eq!(task.estimated_hours, 0);
    assert_eq!(task.actual_hours, 0);
    assert_eq!(task.priority, PriorityKind::Medium);
    assert_eq!(task.status, StatusKind::NotStarted);
    assert!(!task.is_milestone);
}

#[tokio::test]
async fn test_create_task_rejects_bad_names() {
    let (project, mut engine) = setup_engine();

    let err = engine
        .create_task(root_task(project, "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_task(root_task(project, &"x".repeat(301)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_create_task_rejects_inverted_planned_dates() {
    let (project, mut engine) = setup_engine();

    let mut dto = root_task(project, "window");
    dto.planned_start_date = Some(date(2026, 9, 10));
    dto.planned_end_date = Some(date(2026, 9, 1));

    let err = engine.create_task(dto).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::DateOrderInvalid {
            kind: DateKind::Planned
        }
    ));
}

#[tokio::test]
async fn test_create_task_rejects_negative_hours() {
    let (project, mut engine) = setup_engine();

    let mut dto = root_task(project, "estimate");
    dto.estimated_hours = Some(-4);

    let err = engine.create_task(dto).await.unwrap_err();
    assert!(matches!(err, EngineError::NegativeHours(-4)));
}

#[tokio::test]
async fn test_update_checks_merged_date_window() {
    let (project, mut engine) = setup_engine();

    let mut dto = root_task(project, "window");
    dto.planned_start_date = Some(date(2026, 9, 10));
    let task = engine.create_task(dto).await.unwrap();

    // The new end date is checked against the stored start date.
    let err = engine
        .update_task(
            task.id,
            UpdateTaskDto {
                planned_end_date: Some(date(2026, 9, 5)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::DateOrderInvalid {
            kind: DateKind::Planned
        }
    ));

    let updated = engine
        .update_task(
            task.id,
            UpdateTaskDto {
                planned_end_date: Some(date(2026, 9, 20)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.planned_end_date, Some(date(2026, 9, 20)));
}

#[tokio::test]
async fn test_update_actual_dates_and_status() {
    let (project, mut engine) = setup_engine();

    let task = engine.create_task(root_task(project, "work")).await.unwrap();
    let updated = engine
        .update_task(
            task.id,
            UpdateTaskDto {
                actual_start_date: Some(date(2026, 9, 2)),
                actual_end_date: Some(date(2026, 9, 6)),
                actual_hours: Some(12),
                status: Some(StatusKind::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.actual_start_date, Some(date(2026, 9, 2)));
    assert_eq!(updated.actual_end_date, Some(date(2026, 9, 6)));
    assert_eq!(updated.actual_hours, 12);
    assert_eq!(updated.status, StatusKind::InProgress);
}

#[tokio::test]
async fn test_empty_update_is_a_noop() {
    let (project, mut engine) = setup_engine();

    let task = engine.create_task(root_task(project, "idle")).await.unwrap();
    let updated = engine
        .update_task(task.id, UpdateTaskDto::default())
        .await
        .unwrap();
    assert_eq!(updated, task);
}

#[tokio::test]
async fn test_delete_rejected_while_children_exist() {
    let (project, mut engine) = setup_engine();

    let parent = engine.create_task(root_task(project, "parent")).await.unwrap();
    let child = engine
        .create_task(child_task(project, parent.id, "child"))
        .await
        .unwrap();

    let err = engine.delete_task(parent.id).await.unwrap_err();
    assert!(matches!(err, EngineError::HasChildren(_)));

    // Children first, then the parent.
    engine.delete_task(child.id).await.unwrap();
    engine.delete_task(parent.id).await.unwrap();
    assert!(matches!(
        engine.get_task(parent.id).await.unwrap_err(),
        EngineError::TaskNotFound(_)
    ));
}

#[tokio::test]
async fn test_delete_cascades_dependency_edges() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();
    let c = engine.create_task(root_task(project, "c")).await.unwrap();
    engine.create_edge(edge(a.id, b.id)).await.unwrap();
    engine.create_edge(edge(b.id, c.id)).await.unwrap();

    engine.delete_task(b.id).await.unwrap();

    // Both edges touching b are gone; a and c survive untouched.
    assert!(engine.project_dependencies(project).await.unwrap().is_empty());
    engine.get_task(a.id).await.unwrap();
    engine.get_task(c.id).await.unwrap();
}

#[tokio::test]
async fn test_create_with_predecessors_links_all() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();

    let mut dto = root_task(project, "c");
    dto.predecessors = Some(vec![a.id, b.id]);
    let c = engine.create_task(dto).await.unwrap();

    let edges = engine.project_dependencies(project).await.unwrap();
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().all(|e| e.successor_id == c.id));
}

#[tokio::test]
async fn test_create_rolls_back_when_a_predecessor_is_rejected() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();

    let mut dto = root_task(project, "b");
    dto.predecessors = Some(vec![a.id, uuid::Uuid::new_v4()]);
    let err = engine.create_task(dto).await.unwrap_err();
    assert!(matches!(err, EngineError::TaskNotFound(_)));

    // Neither the task nor the first (valid) edge was persisted.
    let tasks = engine
        .list_tasks(project, TaskFilter::default())
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(engine.project_dependencies(project).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_missing_task_is_reported() {
    let (_project, mut engine) = setup_engine();

    let err = engine.get_task(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::TaskNotFound(_)));
}

/// Store that applies one pending task edit the moment the project lock is
/// taken, standing in for a concurrent transaction that commits between the
/// engine's first row fetch and the lock acquisition.
struct RacingStore {
    inner: MemStore,
    pending: Option<(Uuid, TaskChanges)>,
}

impl TaskStore for RacingStore {
    async fn get(&mut self, id: Uuid) -> EngineResult<Option<Task>> {
        self.inner.get(id).await
    }

    async fn list(&mut self, project_id: Uuid, filter: TaskFilter) -> EngineResult<Vec<Task>> {
        self.inner.list(project_id, filter).await
    }

    async fn children(&mut self, parent_id: Uuid) -> EngineResult<Vec<Task>> {
        self.inner.children(parent_id).await
    }

    async fn insert(&mut self, task: NewTask) -> EngineResult<Task> {
        self.inner.insert(task).await
    }

    async fn update(&mut self, id: Uuid, changes: TaskChanges) -> EngineResult<Task> {
        self.inner.update(id, changes).await
    }

    async fn delete(&mut self, id: Uuid) -> EngineResult<bool> {
        self.inner.delete(id).await
    }

    async fn max_sort_order(&mut self, project_id: Uuid) -> EngineResult<i32> {
        self.inner.max_sort_order(project_id).await
    }

    async fn project_exists(&mut self, project_id: Uuid) -> EngineResult<bool> {
        self.inner.project_exists(project_id).await
    }
}

impl DependencyStore for RacingStore {
    async fn edges_from(&mut self, task_id: Uuid) -> EngineResult<Vec<Dependency>> {
        self.inner.edges_from(task_id).await
    }

    async fn edges_into(&mut self, task_id: Uuid) -> EngineResult<Vec<Dependency>> {
        self.inner.edges_into(task_id).await
    }

    async fn get_edge(
        &mut self,
        predecessor_id: Uuid,
        successor_id: Uuid,
    ) -> EngineResult<Option<Dependency>> {
        self.inner.get_edge(predecessor_id, successor_id).await
    }

    async fn insert_edge(&mut self, edge: NewDependency) -> EngineResult<Dependency> {
        self.inner.insert_edge(edge).await
    }

    async fn delete_edge(
        &mut self,
        predecessor_id: Uuid,
        successor_id: Uuid,
    ) -> EngineResult<bool> {
        self.inner.delete_edge(predecessor_id, successor_id).await
    }

    async fn delete_edges_for_task(&mut self, task_id: Uuid) -> EngineResult<usize> {
        self.inner.delete_edges_for_task(task_id).await
    }

    async fn edges_for_project(&mut self, project_id: Uuid) -> EngineResult<Vec<Dependency>> {
        self.inner.edges_for_project(project_id).await
    }
}

impl Store for RacingStore {
    async fn begin(&mut self) -> EngineResult<()> {
        self.inner.begin().await
    }

    async fn commit(&mut self) -> EngineResult<()> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> EngineResult<()> {
        self.inner.rollback().await
    }

    async fn lock_project(&mut self, project_id: Uuid) -> EngineResult<()> {
        if let Some((id, changes)) = self.pending.take() {
            self.inner.update(id, changes).await?;
        }
        self.inner.lock_project(project_id).await
    }
}

#[tokio::test]
async fn test_update_validates_against_row_committed_before_lock() {
    let (project, mut engine) = setup_engine();

    let mut dto = root_task(project, "window");
    dto.planned_start_date = Some(date(2026, 9, 10));
    let task = engine.create_task(dto).await.unwrap();

    // While this update is in flight, another writer moves the start date
    // past the end date the patch is about to set.
    let racing = RacingStore {
        inner: engine.into_store(),
        pending: Some((
            task.id,
            TaskChanges {
                planned_start_date: Some(date(2026, 9, 25)),
                ..Default::default()
            },
        )),
    };
    let mut engine = TaskEngine::new(racing);

    // Against the stale row (start 09-10) the patch would pass; against the
    // row as committed under the lock it must not.
    let err = engine
        .update_task(
            task.id,
            UpdateTaskDto {
                planned_end_date: Some(date(2026, 9, 20)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::DateOrderInvalid {
            kind: DateKind::Planned
        }
    ));
}
