mod common;
use common::*;

use gunchart_core::error::EngineError;
use gunchart_core::models::DependencyKind;

#[tokio::test]
async fn test_create_edge_defaults() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();

    let created = engine.create_edge(edge(a.id, b.id)).await.unwrap();
    assert_eq!(created.predecessor_id, a.id);
    assert_eq!(created.successor_id, b.id);
    assert_eq!(created.kind, DependencyKind::FinishToStart);
    assert_eq!(created.lag_days, 0);
}

#[tokio::test]
async fn test_direct_cycle_rejected() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();

    engine.create_edge(edge(a.id, b.id)).await.unwrap();
    let err = engine.create_edge(edge(b.id, a.id)).await.unwrap_err();
    assert!(matches!(err, EngineError::CycleDetected { .. }));

    // The rejected edge left no trace.
    let edges = engine.project_dependencies(project).await.unwrap();
    assert_eq!(edges.len(), 1);
}

#[tokio::test]
async fn test_transitive_cycle_rejected() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();
    let c = engine.create_task(root_task(project, "c")).await.unwrap();

    engine.create_edge(edge(a.id, b.id)).await.unwrap();
    engine.create_edge(edge(b.id, c.id)).await.unwrap();

    let err = engine.create_edge(edge(c.id, a.id)).await.unwrap_err();
    assert!(matches!(err, EngineError::CycleDetected { .. }));
}

#[tokio::test]
async fn test_diamond_is_not_a_cycle() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();
    let c = engine.create_task(root_task(project, "c")).await.unwrap();
    let d = engine.create_task(root_task(project, "d")).await.unwrap();

    engine.create_edge(edge(a.id, b.id)).await.unwrap();
    engine.create_edge(edge(a.id, c.id)).await.unwrap();
    engine.create_edge(edge(b.id, d.id)).await.unwrap();
    engine.create_edge(edge(c.id, d.id)).await.unwrap();

    assert_eq!(engine.project_dependencies(project).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_self_dependency_rejected() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let err = engine.create_edge(edge(a.id, a.id)).await.unwrap_err();
    assert!(matches!(err, EngineError::SelfDependency(_)));
}

#[tokio::test]
async fn test_duplicate_edge_rejected() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();

    engine.create_edge(edge(a.id, b.id)).await.unwrap();
    let err = engine.create_edge(edge(a.id, b.id)).await.unwrap_err();
    assert!(matches!(err, EngineError::DuplicateEdge { .. }));
}

#[tokio::test]
async fn test_cross_project_edge_rejected() {
    let (first, second, mut engine) = setup_two_projects();

    let a = engine.create_task(root_task(first, "a")).await.unwrap();
    let b = engine.create_task(root_task(second, "b")).await.unwrap();

    let err = engine.create_edge(edge(a.id, b.id)).await.unwrap_err();
    assert!(matches!(err, EngineError::CrossProject { .. }));
}

#[tokio::test]
async fn test_remove_edge_then_repeat_reports_missing() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();
    engine.create_edge(edge(a.id, b.id)).await.unwrap();

    engine.remove_edge(a.id, b.id).await.unwrap();
    let err = engine.remove_edge(a.id, b.id).await.unwrap_err();
    assert!(matches!(err, EngineError::DependencyNotFound { .. }));

    // With the edge gone the reverse direction is legal again.
    engine.create_edge(edge(b.id, a.id)).await.unwrap();
}

#[tokio::test]
async fn test_valid_predecessors_for_root_task() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();
    let c = engine.create_task(root_task(project, "c")).await.unwrap();
    // Nested tasks never appear in a root's candidate set.
    engine
        .create_task(child_task(project, a.id, "nested"))
        .await
        .unwrap();

    let mut ids: Vec<_> = engine
        .valid_predecessors(b.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    ids.sort();
    let mut expected = vec![a.id, c.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_valid_predecessors_for_nested_task() {
    let (project, mut engine) = setup_engine();

    let root = engine.create_task(root_task(project, "root")).await.unwrap();
    let parent = engine
        .create_task(child_task(project, root.id, "parent"))
        .await
        .unwrap();
    let task = engine
        .create_task(child_task(project, parent.id, "task"))
        .await
        .unwrap();
    let sibling = engine
        .create_task(child_task(project, parent.id, "sibling"))
        .await
        .unwrap();
    // An unrelated root is not a candidate for a nested task.
    engine.create_task(root_task(project, "other")).await.unwrap();

    let mut ids: Vec<_> = engine
        .valid_predecessors(task.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    ids.sort();
    let mut expected = vec![sibling.id, parent.id, root.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_strict_policy_rejects_outside_candidate_set() {
    let (project, mut engine) = setup_strict_engine();

    let root = engine.create_task(root_task(project, "root")).await.unwrap();
    let nested = engine
        .create_task(child_task(project, root.id, "nested"))
        .await
        .unwrap();
    let other = engine.create_task(root_task(project, "other")).await.unwrap();

    // `other` is neither a sibling nor an ancestor of `nested`.
    let err = engine
        .create_edge(edge(other.id, nested.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPredecessor { .. }));

    // The ancestor itself is allowed.
    engine.create_edge(edge(root.id, nested.id)).await.unwrap();
}

#[tokio::test]
async fn test_edge_with_explicit_kind_and_lag() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let b = engine.create_task(root_task(project, "b")).await.unwrap();

    let created = engine
        .create_edge(gunchart_core::dtos::NewDependencyDto {
            predecessor_id: a.id,
            successor_id: b.id,
            kind: Some(DependencyKind::StartToStart),
            lag_days: Some(-2),
        })
        .await
        .unwrap();
    assert_eq!(created.kind, DependencyKind::StartToStart);
    assert_eq!(created.lag_days, -2);
}

#[tokio::test]
async fn test_edge_to_missing_task_is_reported() {
    let (project, mut engine) = setup_engine();

    let a = engine.create_task(root_task(project, "a")).await.unwrap();
    let err = engine
        .create_edge(edge(a.id, uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::TaskNotFound(_)));
}
