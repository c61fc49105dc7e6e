//! Client-side input checks, run before any request is sent.

use crate::error::CoreError;
use crate::types::{StageId, STAGE_COUNT};

/// Upper bound on a serial number, matching the scanner's label width.
pub const MAX_SERIAL_LEN: usize = 64;

/// Parse a daily goal typed into the goal field.
///
/// Rejects empty input, anything that is not a whole number, and values
/// that are not strictly positive.
pub fn parse_daily_goal(raw: &str) -> Result<u32, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CoreError::Validation("daily goal is required".into()));
    }
    let goal: i64 = raw
        .parse()
        .map_err(|_| CoreError::Validation(format!("daily goal '{raw}' is not a number")))?;
    validate_daily_goal(goal)
}

/// Check an already-numeric goal.
pub fn validate_daily_goal(goal: i64) -> Result<u32, CoreError> {
    if goal <= 0 {
        return Err(CoreError::Validation(
            "daily goal must be a positive number".into(),
        ));
    }
    u32::try_from(goal)
        .map_err(|_| CoreError::Validation(format!("daily goal {goal} is too large")))
}

/// Trim a scanned serial number and reject blanks or control characters.
pub fn normalize_serial_number(raw: &str) -> Result<String, CoreError> {
    let serial = raw.trim();
    if serial.is_empty() {
        return Err(CoreError::Validation("serial number is required".into()));
    }
    if serial.len() > MAX_SERIAL_LEN {
        return Err(CoreError::Validation(format!(
            "serial number exceeds {MAX_SERIAL_LEN} characters"
        )));
    }
    if serial.chars().any(char::is_control) {
        return Err(CoreError::Validation(
            "serial number contains control characters".into(),
        ));
    }
    Ok(serial.to_string())
}

/// Product ids typed into the analysis lookup must not be blank.
pub fn normalize_product_id(raw: &str) -> Result<String, CoreError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(CoreError::Validation("product id is required".into()));
    }
    Ok(id.to_string())
}

/// Stages run from 1 to [`STAGE_COUNT`].
pub fn validate_stage(stage: StageId) -> Result<StageId, CoreError> {
    if stage == 0 || usize::from(stage) > STAGE_COUNT {
        return Err(CoreError::Validation(format!(
            "stage must be between 1 and {STAGE_COUNT}, got {stage}"
        )));
    }
    Ok(stage)
}
