//! Postgres storage backend built on diesel-async.
//!
//! A `PgStore` owns one pooled connection for its lifetime, so every
//! operation between `begin` and `commit` runs on the same session.
//! Transactions are issued as raw `BEGIN`/`COMMIT`/`ROLLBACK` statements and
//! per-project serialization uses `pg_advisory_xact_lock`, released
//! automatically when the transaction ends.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{Dependency, NewDependency, NewTask, Task, TaskChanges};
use crate::schema::{dependency, project, task};
use crate::store::{DependencyStore, Store, TaskFilter, TaskStore};
use crate::{Conn, DbPool};

/// Postgres-backed store.
pub struct PgStore {
    conn: Conn,
}

impl PgStore {
    pub fn new(conn: Conn) -> Self {
        PgStore { conn }
    }

    /// Check a connection out of the pool and wrap it.
    pub async fn from_pool(pool: &DbPool) -> EngineResult<Self> {
        let conn = pool
            .get()
            .await
            .map_err(|e| EngineError::Pool(e.to_string()))?;
        Ok(PgStore { conn })
    }
}

/// Compute a deterministic i64 advisory lock key for a project. All engine
/// transactions mutating a project's hierarchy or dependency graph take this
/// lock, so concurrent cycle checks never race against a stale edge set.
fn project_lock_key(project_id: Uuid) -> i64 {
    let mut hasher = DefaultHasher::new();
    "project".hash(&mut hasher);
    project_id.hash(&mut hasher);
    hasher.finish() as i64
}

impl TaskStore for PgStore {
    async fn get(&mut self, id: Uuid) -> EngineResult<Option<Task>> {
        let row = task::table
            .find(id)
            .select(Task::as_select())
            .first::<Task>(&mut self.conn)
            .await
            .optional()?;
        Ok(row)
    }

    async fn list(&mut self, project_id: Uuid, filter: TaskFilter) -> EngineResult<Vec<Task>> {
        let mut query = task::table
            .filter(task::project_id.eq(project_id))
            .into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(task::status.eq(status));
        }
        if let Some(level) = filter.level {
            query = query.filter(task::level.eq(level));
        }
        let rows = query
            .order((task::sort_order.asc(), task::id.asc()))
            .select(Task::as_select())
            .load::<Task>(&mut self.conn)
            .await?;
        Ok(rows)
    }

    async fn children(&mut self, parent_id: Uuid) -> EngineResult<Vec<Task>> {
        let rows = task::table
            .filter(task::parent_id.eq(parent_id))
            .order((task::sort_order.asc(), task::id.asc()))
            .select(Task::as_select())
            .load::<Task>(&mut self.conn)
            .await?;
        Ok(rows)
    }

    async fn insert(&mut self, new_task: NewTask) -> EngineResult<Task> {
        let row = diesel::insert_into(task::table)
            .values(&new_task)
            .returning(Task::as_returning())
            .get_result(&mut self.conn)
            .await?;
        Ok(row)
    }

    async fn update(&mut self, id: Uuid, changes: TaskChanges) -> EngineResult<Task> {
        // updated_at rides along so the changeset is never empty.
        let row = diesel::update(task::table.find(id))
            .set((&changes, task::updated_at.eq(diesel::dsl::now)))
            .returning(Task::as_returning())
            .get_result(&mut self.conn)
            .await
            .optional()?
            .ok_or(EngineError::TaskNotFound(id))?;
        Ok(row)
    }

    async fn delete(&mut self, id: Uuid) -> EngineResult<bool> {
        let deleted = diesel::delete(task::table.find(id))
            .execute(&mut self.conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn max_sort_order(&mut self, project_id: Uuid) -> EngineResult<i32> {
        let max: Option<i32> = task::table
            .filter(task::project_id.eq(project_id))
            .select(diesel::dsl::max(task::sort_order))
            .first(&mut self.conn)
            .await?;
        Ok(max.unwrap_or(0))
    }

    async fn project_exists(&mut self, project_id: Uuid) -> EngineResult<bool> {
        let exists = diesel::select(diesel::dsl::exists(project::table.find(project_id)))
            .get_result::<bool>(&mut self.conn)
            .await?;
        Ok(exists)
    }
}

impl DependencyStore for PgStore {
    async fn edges_from(&mut self, task_id: Uuid) -> EngineResult<Vec<Dependency>> {
        let rows = dependency::table
            .filter(dependency::predecessor_id.eq(task_id))
            .select(Dependency::as_select())
            .load::<Dependency>(&mut self.conn)
            .await?;
        Ok(rows)
    }

    async fn edges_into(&mut self, task_id: Uuid) -> EngineResult<Vec<Dependency>> {
        let rows = dependency::table
            .filter(dependency::successor_id.eq(task_id))
            .select(Dependency::as_select())
            .load::<Dependency>(&mut self.conn)
            .await?;
        Ok(rows)
    }

    async fn get_edge(
        &mut self,
        predecessor_id: Uuid,
        successor_id: Uuid,
    ) -> EngineResult<Option<Dependency>> {
        let row = dependency::table
            .filter(
                dependency::predecessor_id
                    .eq(predecessor_id)
                    .and(dependency::successor_id.eq(successor_id)),
            )
            .select(Dependency::as_select())
            .first::<Dependency>(&mut self.conn)
            .await
            .optional()?;
        Ok(row)
    }

    async fn insert_edge(&mut self, edge: NewDependency) -> EngineResult<Dependency> {
        let row = diesel::insert_into(dependency::table)
            .values(&edge)
            .returning(Dependency::as_returning())
            .get_result(&mut self.conn)
            .await?;
        Ok(row)
    }

    async fn delete_edge(
        &mut self,
        predecessor_id: Uuid,
        successor_id: Uuid,
    ) -> EngineResult<bool> {
        let deleted = diesel::delete(
            dependency::table.filter(
                dependency::predecessor_id
                    .eq(predecessor_id)
                    .and(dependency::successor_id.eq(successor_id)),
            ),
        )
        .execute(&mut self.conn)
        .await?;
        Ok(deleted > 0)
    }

    async fn delete_edges_for_task(&mut self, task_id: Uuid) -> EngineResult<usize> {
        let deleted = diesel::delete(
            dependency::table.filter(
                dependency::predecessor_id
                    .eq(task_id)
                    .or(dependency::successor_id.eq(task_id)),
            ),
        )
        .execute(&mut self.conn)
        .await?;
        Ok(deleted)
    }

    async fn edges_for_project(&mut self, project_id: Uuid) -> EngineResult<Vec<Dependency>> {
        let rows = dependency::table
            .inner_join(task::table.on(task::id.eq(dependency::predecessor_id)))
            .filter(task::project_id.eq(project_id))
            .select(Dependency::as_select())
            .load::<Dependency>(&mut self.conn)
            .await?;
        Ok(rows)
    }
}

impl Store for PgStore {
    async fn begin(&mut self) -> EngineResult<()> {
        diesel::sql_query("BEGIN").execute(&mut self.conn).await?;
        Ok(())
    }

    async fn commit(&mut self) -> EngineResult<()> {
        diesel::sql_query("COMMIT").execute(&mut self.conn).await?;
        Ok(())
    }

    async fn rollback(&mut self) -> EngineResult<()> {
        diesel::sql_query("ROLLBACK").execute(&mut self.conn).await?;
        Ok(())
    }

    async fn lock_project(&mut self, project_id: Uuid) -> EngineResult<()> {
        let key = project_lock_key(project_id);
        diesel::sql_query(format!("SELECT pg_advisory_xact_lock({})", key))
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }
}
