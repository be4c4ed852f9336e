//! Task-tree maintenance: level computation, reparenting, progress roll-up
//! and the read-only tree view.
//!
//! The tree and the dependency graph are independent overlays on the same
//! task id space; nothing here touches dependency edges.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::dtos::TaskNode;
use crate::error::{EngineError, EngineResult};
use crate::models::{Task, TaskChanges};
use crate::store::{TaskFilter, TaskStore};

/// Deepest allowed hierarchy level. A task at this level may not gain
/// children.
pub const MAX_LEVEL: i32 = 3;

/// Level for a task nested under `parent` (0 when parentless). An explicit
/// `requested` level is honored for nested tasks as long as it stays inside
/// 1..=MAX_LEVEL; root tasks are always level 0.
pub fn compute_level(parent: Option<&Task>, requested: Option<i32>) -> EngineResult<i32> {
    let Some(parent) = parent else {
        return Ok(0);
    };
    if parent.level >= MAX_LEVEL {
        return Err(EngineError::DepthExceeded {
            level: parent.level + 1,
            max: MAX_LEVEL,
        });
    }
    let level = requested.unwrap_or(parent.level + 1);
    if level > MAX_LEVEL {
        return Err(EngineError::DepthExceeded {
            level,
            max: MAX_LEVEL,
        });
    }
    if level < 1 {
        return Err(EngineError::Validation(format!(
            "Level {} is invalid for a nested task",
            level
        )));
    }
    Ok(level)
}

/// Rolled-up progress for a parent: the integer-truncated mean of the
/// immediate children's progress. `None` for a childless task, since leaf
/// values are manually entered and never derived.
pub fn rollup(children: &[Task]) -> Option<i32> {
    if children.is_empty() {
        return None;
    }
    let total: i64 = children.iter().map(|c| i64::from(c.progress_rate)).sum();
    Some((total / children.len() as i64) as i32)
}

/// Recompute progress bottom-up starting at `task_id` and walking the parent
/// chain to the root. Each pass re-reads fresh child values, so an ancestor
/// always aggregates the values written by the pass below it.
pub async fn propagate_progress<S: TaskStore>(store: &mut S, task_id: Uuid) -> EngineResult<()> {
    let mut cursor = Some(task_id);
    while let Some(id) = cursor {
        let task = store
            .get(id)
            .await?
            .ok_or(EngineError::TaskNotFound(id))?;
        let children = store.children(id).await?;
        if let Some(mean) = rollup(&children)
            && mean != task.progress_rate
        {
            store.update(id, TaskChanges::progress(mean)).await?;
        }
        cursor = task.parent_id;
    }
    Ok(())
}

/// Move a task under a new parent (or detach it to the root level).
///
/// Fails with `CycleDetected` when the new parent is the task itself or one
/// of its descendants, and with `DepthExceeded` when the task's subtree would
/// not fit under the new position. Descendant levels are cascade-recomputed,
/// and progress is re-rolled-up along both the old and the new parent chain.
pub async fn reparent<S: TaskStore>(
    store: &mut S,
    task_id: Uuid,
    new_parent_id: Option<Uuid>,
    requested_level: Option<i32>,
) -> EngineResult<Task> {
    let task = store
        .get(task_id)
        .await?
        .ok_or(EngineError::TaskNotFound(task_id))?;

    let new_level = match new_parent_id {
        Some(parent_id) => {
            if parent_id == task_id {
                return Err(EngineError::CycleDetected {
                    message: format!("task {} cannot be its own parent", task_id),
                });
            }
            let parent = store
                .get(parent_id)
                .await?
                .ok_or(EngineError::TaskNotFound(parent_id))?;
            if parent.project_id != task.project_id {
                return Err(EngineError::Validation(
                    "Parent task belongs to a different project".to_string(),
                ));
            }
            ensure_not_ancestor(store, task_id, parent_id).await?;
            compute_level(Some(&parent), requested_level)?
        }
        None => compute_level(None, requested_level)?,
    };

    let depth = subtree_depth(store, task_id).await?;
    if new_level + depth > MAX_LEVEL {
        return Err(EngineError::DepthExceeded {
            level: new_level + depth,
            max: MAX_LEVEL,
        });
    }

    let moved = store
        .update(task_id, TaskChanges::position(new_parent_id, new_level))
        .await?;
    relevel_descendants(store, task_id, new_level).await?;

    if let Some(old_parent) = task.parent_id {
        propagate_progress(store, old_parent).await?;
    }
    if let Some(new_parent) = new_parent_id {
        propagate_progress(store, new_parent).await?;
    }

    Ok(moved)
}

/// Walk up from `start` toward the root; finding `task_id` on the way means
/// the move would make the task an ancestor of its own parent.
async fn ensure_not_ancestor<S: TaskStore>(
    store: &mut S,
    task_id: Uuid,
    start: Uuid,
) -> EngineResult<()> {
    let mut seen = HashSet::new();
    let mut cursor = Some(start);
    while let Some(current) = cursor {
        if current == task_id {
            return Err(EngineError::CycleDetected {
                message: format!("task {} cannot be moved under its own subtree", task_id),
            });
        }
        if !seen.insert(current) {
            break;
        }
        cursor = store.get(current).await?.and_then(|t| t.parent_id);
    }
    Ok(())
}

/// Height of the subtree rooted at `root`, 0 for a leaf.
async fn subtree_depth<S: TaskStore>(store: &mut S, root: Uuid) -> EngineResult<i32> {
    let mut depth = 0;
    let mut frontier = vec![root];
    loop {
        let mut next = Vec::new();
        for id in &frontier {
            for child in store.children(*id).await? {
                next.push(child.id);
            }
        }
        if next.is_empty() {
            return Ok(depth);
        }
        depth += 1;
        frontier = next;
    }
}

/// Rewrite `level` for every descendant so each child sits exactly one level
/// below its parent.
async fn relevel_descendants<S: TaskStore>(
    store: &mut S,
    root: Uuid,
    root_level: i32,
) -> EngineResult<()> {
    let mut frontier = vec![(root, root_level)];
    while let Some((id, level)) = frontier.pop() {
        for child in store.children(id).await? {
            if child.level != level + 1 {
                store.update(child.id, TaskChanges::level(level + 1)).await?;
            }
            frontier.push((child.id, level + 1));
        }
    }
    Ok(())
}

/// Read-only forest view of a project: all level-0 tasks as roots, each with
/// its subtasks materialized in `sort_order`. No mutation.
pub async fn build_tree<S: TaskStore>(
    store: &mut S,
    project_id: Uuid,
) -> EngineResult<Vec<TaskNode>> {
    let tasks = store.list(project_id, TaskFilter::default()).await?;

    let mut by_parent: HashMap<Uuid, Vec<&Task>> = HashMap::new();
    for t in &tasks {
        if let Some(parent_id) = t.parent_id {
            by_parent.entry(parent_id).or_default().push(t);
        }
    }

    fn build_node(task: &Task, by_parent: &HashMap<Uuid, Vec<&Task>>) -> TaskNode {
        let subtasks = by_parent
            .get(&task.id)
            .map(|kids| kids.iter().map(|k| build_node(k, by_parent)).collect())
            .unwrap_or_default();
        TaskNode::from_task(task, subtasks)
    }

    Ok(tasks
        .iter()
        .filter(|t| t.level == 0)
        .map(|t| build_node(t, &by_parent))
        .collect())
}

/// Deletion is blocked while any task still points at this one as its parent.
pub async fn validate_deletion<S: TaskStore>(store: &mut S, task_id: Uuid) -> EngineResult<()> {
    if !store.children(task_id).await?.is_empty() {
        return Err(EngineError::HasChildren(task_id));
    }
    Ok(())
}
