//! Shared helpers for the integration test suite.
//!
//! Every test runs against the in-memory store, so the suite needs no
//! database and exercises exactly the code paths the engine runs in
//! production, minus the SQL layer.

#![allow(dead_code)]

use uuid::Uuid;

use gunchart_core::dtos::{NewDependencyDto, NewTaskDto, UpdateTaskDto};
use gunchart_core::engine::{EnginePolicy, TaskEngine};
use gunchart_core::store::MemStore;

/// Fresh engine with one seeded project.
pub fn setup_engine() -> (Uuid, TaskEngine<MemStore>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let project_id = Uuid::new_v4();
    let mut store = MemStore::new();
    store.add_project(project_id);
    (project_id, TaskEngine::new(store))
}

/// Fresh engine with two seeded projects, for cross-project cases.
pub fn setup_two_projects() -> (Uuid, Uuid, TaskEngine<MemStore>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let mut store = MemStore::new();
    store.add_project(first);
    store.add_project(second);
    (first, second, TaskEngine::new(store))
}

/// Same, but with strict predecessor validation turned on.
pub fn setup_strict_engine() -> (Uuid, TaskEngine<MemStore>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let project_id = Uuid::new_v4();
    let mut store = MemStore::new();
    store.add_project(project_id);
    (
        project_id,
        TaskEngine::with_policy(
            store,
            EnginePolicy {
                strict_predecessors: true,
            },
        ),
    )
}

/// A minimal root-level task input.
pub fn root_task(project_id: Uuid, name: &str) -> NewTaskDto {
    NewTaskDto {
        project_id,
        parent_id: None,
        level: None,
        name: name.to_string(),
        description: None,
        planned_start_date: None,
        planned_end_date: None,
        estimated_hours: None,
        priority: None,
        category: None,
        is_milestone: None,
        predecessors: None,
    }
}

/// A minimal nested task input.
pub fn child_task(project_id: Uuid, parent_id: Uuid, name: &str) -> NewTaskDto {
    NewTaskDto {
        parent_id: Some(parent_id),
        ..root_task(project_id, name)
    }
}

/// A finish-to-start edge input with default lag.
pub fn edge(predecessor_id: Uuid, successor_id: Uuid) -> NewDependencyDto {
    NewDependencyDto {
        predecessor_id,
        successor_id,
        kind: None,
        lag_days: None,
    }
}

/// An update patch that only sets progress.
pub fn progress_patch(progress_rate: i32) -> UpdateTaskDto {
    UpdateTaskDto {
        progress_rate: Some(progress_rate),
        ..Default::default()
    }
}
