//! Dependency-graph maintenance: edge validation, cycle detection and the
//! valid-predecessor candidate query.
//!
//! Cycle detection operates purely on stored edges; it never assumes or
//! exploits the parent/child tree.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{Dependency, DependencyKind, NewDependency, Task};
use crate::store::{DependencyStore, TaskFilter, TaskStore};

/// Validate and persist a `predecessor -> successor` edge.
///
/// Rejection order: self-loop, cross-project, duplicate ordered pair, then
/// (with the strict policy) candidate-set membership, then acyclicity. The
/// caller is expected to run this inside a transaction holding the project
/// lock, so the cycle check and the insert are one atomic unit.
pub async fn create_edge<S: TaskStore + DependencyStore>(
    store: &mut S,
    predecessor: &Task,
    successor: &Task,
    kind: DependencyKind,
    lag_days: i32,
    strict: bool,
) -> EngineResult<Dependency> {
    if predecessor.id == successor.id {
        return Err(EngineError::SelfDependency(predecessor.id));
    }
    if predecessor.project_id != successor.project_id {
        return Err(EngineError::CrossProject {
            predecessor: predecessor.id,
            successor: successor.id,
        });
    }
    if store.get_edge(predecessor.id, successor.id).await?.is_some() {
        return Err(EngineError::DuplicateEdge {
            predecessor: predecessor.id,
            successor: successor.id,
        });
    }
    if strict {
        let candidates = valid_predecessors(store, successor).await?;
        if !candidates.iter().any(|t| t.id == predecessor.id) {
            return Err(EngineError::InvalidPredecessor {
                predecessor: predecessor.id,
                successor: successor.id,
            });
        }
    }
    if would_create_cycle(store, predecessor.id, successor.id).await? {
        return Err(EngineError::CycleDetected {
            message: format!(
                "dependency {} -> {} would close a loop",
                predecessor.id, successor.id
            ),
        });
    }

    let edge = store
        .insert_edge(NewDependency {
            predecessor_id: predecessor.id,
            successor_id: successor.id,
            kind,
            lag_days,
        })
        .await?;
    log::debug!(
        "created dependency {} -> {} ({:?}, lag {})",
        edge.predecessor_id,
        edge.successor_id,
        edge.kind,
        edge.lag_days
    );
    Ok(edge)
}

/// Would inserting `predecessor -> successor` close a directed loop?
///
/// Backward reachability over existing edges: starting from the successor,
/// repeatedly expand each node into its stored predecessors. That set is
/// everything already required to finish before the successor; finding the
/// candidate predecessor in it means the new edge completes a cycle.
/// O(V + E) per insertion in the worst case.
pub async fn would_create_cycle<S: DependencyStore>(
    store: &mut S,
    predecessor_id: Uuid,
    successor_id: Uuid,
) -> EngineResult<bool> {
    let mut visited: HashSet<Uuid> = HashSet::new();
    let mut stack = vec![successor_id];

    while let Some(current) = stack.pop() {
        if current == predecessor_id {
            return Ok(true);
        }
        if !visited.insert(current) {
            continue;
        }
        for edge in store.edges_into(current).await? {
            if !visited.contains(&edge.predecessor_id) {
                stack.push(edge.predecessor_id);
            }
        }
    }

    Ok(false)
}

/// Predecessor candidates for a task, derived from its hierarchy position
/// alone (the dependency graph never influences the set):
///
/// - level 0: every other level-0 task of the same project;
/// - nested: siblings under the same parent (excluding self), plus the chain
///   of ancestors up to the root.
///
/// The list is advisory (UI-facing); `create_edge` only enforces it under the
/// strict predecessor policy.
pub async fn valid_predecessors<S: TaskStore>(
    store: &mut S,
    task: &Task,
) -> EngineResult<Vec<Task>> {
    if task.level == 0 {
        let roots = store.list(task.project_id, TaskFilter::level(0)).await?;
        return Ok(roots.into_iter().filter(|t| t.id != task.id).collect());
    }

    let Some(parent_id) = task.parent_id else {
        // Nested level without a parent reference: inconsistent row, no
        // candidates.
        return Ok(Vec::new());
    };

    let mut candidates: Vec<Task> = store
        .children(parent_id)
        .await?
        .into_iter()
        .filter(|t| t.id != task.id)
        .collect();

    let mut cursor = Some(parent_id);
    while let Some(current) = cursor {
        let Some(ancestor) = store.get(current).await? else {
            break;
        };
        cursor = ancestor.parent_id;
        candidates.push(ancestor);
    }

    Ok(candidates)
}

/// Delete an edge by its ordered pair. A second call for the same pair
/// reports `DependencyNotFound`.
pub async fn remove_edge<S: DependencyStore>(
    store: &mut S,
    predecessor_id: Uuid,
    successor_id: Uuid,
) -> EngineResult<()> {
    if !store.delete_edge(predecessor_id, successor_id).await? {
        return Err(EngineError::DependencyNotFound {
            predecessor: predecessor_id,
            successor: successor_id,
        });
    }
    Ok(())
}
