#![allow(async_fn_in_trait)]

pub mod config;
pub mod dtos;
pub mod engine;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod models;
pub mod schema;
pub mod store;
pub mod validation;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

use crate::config::Config;
use crate::error::{EngineError, EngineResult};

/// Short-hand for the database pool type to use throughout the app.
pub type DbPool = diesel_async::pooled_connection::deadpool::Pool<AsyncPgConnection>;

/// A connection checked out of the pool.
pub type Conn = diesel_async::pooled_connection::deadpool::Object<AsyncPgConnection>;

/// Embedded schema migrations, so deployments and test harnesses can run them
/// without shipping the `migrations/` directory alongside the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Build the shared connection pool from configuration.
pub fn create_pool(config: &Config) -> EngineResult<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    DbPool::builder(manager)
        .max_size(config.pool.max_size as usize)
        .build()
        .map_err(|e| EngineError::Pool(e.to_string()))
}
