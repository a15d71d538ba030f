//! Input validation module
//!
//! Validates API inputs before they reach the bedtime form.

use crate::error::{AppError, AppResult};
use crate::models::{
    CoffeeAmount, CoffeeAmountInput, EstimateInput, SleepAmount, SleepAmountInput,
};
use tracing::{debug, warn};
use validator::{Validate, ValidationErrors};

/// Form control constraints
pub struct FormConstraints;

impl FormConstraints {
    /// Sleep amount stepper range (hours)
    pub const SLEEP_MIN_HOURS: f64 = 4.0;
    pub const SLEEP_MAX_HOURS: f64 = 12.0;
    pub const SLEEP_STEP_HOURS: f64 = 0.25;

    /// Coffee amount stepper range (cups per day)
    pub const COFFEE_MIN_CUPS: u32 = 1;
    pub const COFFEE_MAX_CUPS: u32 = 20;
}

/// Flatten `validator` errors into one message
fn describe(validation_errors: &ValidationErrors) -> String {
    let error_messages: Vec<String> = validation_errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let msgs: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.message.as_ref().map(|c| c.as_ref()))
                .collect();
            format!("{}: {}", field, msgs.join(", "))
        })
        .collect();

    error_messages.join("; ")
}

/// Validate a stateless estimate request
pub fn validate_estimate_input(input: &EstimateInput) -> AppResult<(SleepAmount, CoffeeAmount)> {
    if let Err(validation_errors) = input.validate() {
        let message = describe(&validation_errors);
        warn!(errors = %message, "Estimate input validation failed");
        return Err(AppError::ValidationError(message));
    }

    let sleep = validate_sleep_hours(input.sleep_amount)?;
    let coffee = validate_coffee_cups(input.coffee_amount)?;

    debug!("Estimate input validation passed");
    Ok((sleep, coffee))
}

/// Validate a direct sleep amount assignment
pub fn validate_sleep_input(input: &SleepAmountInput) -> AppResult<SleepAmount> {
    if let Err(validation_errors) = input.validate() {
        return Err(AppError::ValidationError(describe(&validation_errors)));
    }

    validate_sleep_hours(input.hours)
}

/// Validate a direct coffee amount assignment
pub fn validate_coffee_input(input: &CoffeeAmountInput) -> AppResult<CoffeeAmount> {
    if let Err(validation_errors) = input.validate() {
        return Err(AppError::ValidationError(describe(&validation_errors)));
    }

    validate_coffee_cups(input.cups)
}

/// Validate sleep hours: finite, in range, on the 0.25 grid
pub fn validate_sleep_hours(value: f64) -> AppResult<SleepAmount> {
    if !value.is_finite() {
        return Err(AppError::ValidationError(
            "Sleep amount must be a finite number".to_string(),
        ));
    }

    if value < FormConstraints::SLEEP_MIN_HOURS || value > FormConstraints::SLEEP_MAX_HOURS {
        return Err(AppError::ValidationError(format!(
            "Sleep amount {} out of valid range [{}, {}]",
            value,
            FormConstraints::SLEEP_MIN_HOURS,
            FormConstraints::SLEEP_MAX_HOURS
        )));
    }

    SleepAmount::from_hours(value).ok_or_else(|| {
        AppError::ValidationError(format!(
            "Sleep amount {} must be a multiple of {} hours",
            value,
            FormConstraints::SLEEP_STEP_HOURS
        ))
    })
}

/// Validate coffee cups
pub fn validate_coffee_cups(value: u32) -> AppResult<CoffeeAmount> {
    CoffeeAmount::new(value).ok_or_else(|| {
        AppError::ValidationError(format!(
            "Coffee amount {} out of valid range [{}, {}]",
            value,
            FormConstraints::COFFEE_MIN_CUPS,
            FormConstraints::COFFEE_MAX_CUPS
        ))
    })
}
