//! Field-level validation for task creation and update payloads.
//!
//! These checks are pure: they validate the payload (merged with the current
//! row for partial updates) before any row is written. Hierarchy and graph
//! invariants live in `hierarchy` and `graph`.

use chrono::NaiveDate;

use crate::dtos::{NewTaskDto, UpdateTaskDto};
use crate::error::{DateKind, EngineError, EngineResult};
use crate::models::Task;

const MAX_NAME_LEN: usize = 300;

/// Validates a new task DTO before creation.
pub fn validate_new_task(dto: &NewTaskDto) -> EngineResult<()> {
    validate_name(&dto.name)?;
    check_date_order(dto.planned_start_date, dto.planned_end_date, DateKind::Planned)?;
    if let Some(hours) = dto.estimated_hours
        && hours < 0
    {
        return Err(EngineError::NegativeHours(hours));
    }
    Ok(())
}

/// Validates a partial update against the current row. Date ordering is
/// checked on the merged view, so a patch supplying only one end of a date
/// pair is still validated against the stored other end.
pub fn validate_update(task: &Task, dto: &UpdateTaskDto) -> EngineResult<()> {
    if let Some(ref name) = dto.name {
        validate_name(name)?;
    }

    check_date_order(
        dto.planned_start_date.or(task.planned_start_date),
        dto.planned_end_date.or(task.planned_end_date),
        DateKind::Planned,
    )?;
    check_date_order(
        dto.actual_start_date.or(task.actual_start_date),
        dto.actual_end_date.or(task.actual_end_date),
        DateKind::Actual,
    )?;

    if let Some(rate) = dto.progress_rate
        && !(0..=100).contains(&rate)
    {
        return Err(EngineError::ProgressOutOfRange(rate));
    }

    for hours in [dto.estimated_hours, dto.actual_hours].into_iter().flatten() {
        if hours < 0 {
            return Err(EngineError::NegativeHours(hours));
        }
    }

    Ok(())
}

fn validate_name(name: &str) -> EngineResult<()> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation(
            "Task name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::Validation(format!(
            "Task name cannot exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn check_date_order(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    kind: DateKind,
) -> EngineResult<()> {
    if let (Some(s), Some(e)) = (start, end)
        && s >= e
    {
        return Err(EngineError::DateOrderInvalid { kind });
    }
    Ok(())
}
