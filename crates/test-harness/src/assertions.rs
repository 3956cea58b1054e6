//! Assertion helpers with diagnostic output.
//!
//! Every failure names the task and shows expected vs actual, plus the
//! recorded errors when they help explain the mismatch.

use replay_types::{LogEntry, LogLevel, TaskResult, TaskStatus};

use crate::helpers::HarnessError;

fn errors_summary(result: &TaskResult) -> String {
    if result.errors.is_empty() {
        "none".to_string()
    } else {
        result.errors.join(" | ")
    }
}

/// Assert the task status.
pub fn assert_status(
    result: &TaskResult,
    expected: TaskStatus,
    ctx: &str,
) -> Result<(), HarnessError> {
    if result.status == expected {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "[{}] expected status {:?}, got {:?}; errors: {}",
            ctx,
            expected,
            result.status,
            errors_summary(result),
        )))
    }
}

pub fn assert_error_count(
    result: &TaskResult,
    expected: usize,
    ctx: &str,
) -> Result<(), HarnessError> {
    if result.errors.len() == expected {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "[{}] expected {} error(s), got {}: {}",
            ctx,
            expected,
            result.errors.len(),
            errors_summary(result),
        )))
    }
}

/// Assert that some recorded error starts with `prefix`.
pub fn assert_error_prefix(
    result: &TaskResult,
    prefix: &str,
    ctx: &str,
) -> Result<(), HarnessError> {
    if result.errors.iter().any(|e| e.starts_with(prefix)) {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "[{}] no error starts with {:?}; errors: {}",
            ctx,
            prefix,
            errors_summary(result),
        )))
    }
}

pub fn assert_body_count(
    result: &TaskResult,
    expected: usize,
    ctx: &str,
) -> Result<(), HarnessError> {
    let actual = result.metadata.body_count;
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "[{}] expected {} bodies, got {}",
            ctx, expected, actual
        )))
    }
}

/// Assert the bounding box extents (mm) within tolerance.
pub fn assert_extents(
    result: &TaskResult,
    expected: [f64; 3],
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let bb = &result.metadata.bounding_box;
    let actual = [bb.x, bb.y, bb.z];
    for (axis, name) in ["x", "y", "z"].iter().enumerate() {
        if (actual[axis] - expected[axis]).abs() > tol {
            return Err(HarnessError::assertion(format!(
                "[{}] extent {}: expected {:.4}, got {:.4} (tol={})",
                ctx, name, expected[axis], actual[axis], tol,
            )));
        }
    }
    Ok(())
}

/// Assert that an entry at `level` contains `needle`.
pub fn assert_logged(
    entries: &[LogEntry],
    level: LogLevel,
    needle: &str,
    ctx: &str,
) -> Result<(), HarnessError> {
    if entries
        .iter()
        .any(|e| e.level == level && e.message.contains(needle))
    {
        return Ok(());
    }
    let seen: Vec<String> = entries
        .iter()
        .filter(|e| e.level == level)
        .map(|e| e.message.clone())
        .collect();
    Err(HarnessError::assertion(format!(
        "[{}] no {} entry contains {:?}. {} entries at that level: [{}]",
        ctx,
        level.as_str(),
        needle,
        seen.len(),
        seen.join(", "),
    )))
}
