//! Error types for the task hierarchy and dependency engine.
//!
//! Domain failures (depth limit, cycles, duplicate edges, ...) are expected,
//! recoverable conditions that callers must handle explicitly. Storage faults
//! are fatal for the current operation and propagate unchanged; the transaction
//! boundary rolls back any partial writes.

use thiserror::Error;
use uuid::Uuid;

/// Which pair of dates failed the start-before-end check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Planned,
    Actual,
}

impl std::fmt::Display for DateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateKind::Planned => write!(f, "planned"),
            DateKind::Actual => write!(f, "actual"),
        }
    }
}

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Task not found
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    /// Project not found
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    /// Dependency edge not found
    #[error("Dependency not found: {predecessor} -> {successor}")]
    DependencyNotFound { predecessor: Uuid, successor: Uuid },

    /// Start date is not strictly before end date
    #[error("{kind} start date must be before {kind} end date")]
    DateOrderInvalid { kind: DateKind },

    /// Progress rate outside 0..=100
    #[error("Progress rate must be between 0 and 100, got {0}")]
    ProgressOutOfRange(i32),

    /// Estimated or actual hours below zero
    #[error("Hours cannot be negative, got {0}")]
    NegativeHours(i32),

    /// Hierarchy depth limit would be violated
    #[error("Task hierarchy is limited to {max} levels, got level {level}")]
    DepthExceeded { level: i32, max: i32 },

    /// Deletion blocked because subtasks exist
    #[error("Task {0} has subtasks and cannot be deleted")]
    HasChildren(Uuid),

    /// A task may not depend on itself
    #[error("Task {0} cannot depend on itself")]
    SelfDependency(Uuid),

    /// Both endpoints of an edge must belong to the same project
    #[error("Tasks {predecessor} and {successor} belong to different projects")]
    CrossProject { predecessor: Uuid, successor: Uuid },

    /// An edge for this ordered pair already exists
    #[error("Dependency already exists: {predecessor} -> {successor}")]
    DuplicateEdge { predecessor: Uuid, successor: Uuid },

    /// Raised by both the dependency-graph validator and the hierarchy
    /// reparent validator.
    #[error("Cycle detected: {message}")]
    CycleDetected { message: String },

    /// Strict predecessor policy rejected the edge
    #[error("Task {predecessor} is not a valid predecessor for task {successor}")]
    InvalidPredecessor { predecessor: Uuid, successor: Uuid },

    /// Generic validation failure on an input field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(String),
}

impl EngineError {
    /// Whether this is an expected, caller-facing domain failure (as opposed
    /// to a storage fault).
    pub fn is_domain(&self) -> bool {
        !matches!(self, EngineError::Database(_) | EngineError::Pool(_))
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
