//! Data models for the bedtime form and related structures
//!
//! Defines the core data structures used throughout the application.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::bedtime::ClockFormat;
use crate::form::FormSnapshot;
use crate::validation::FormConstraints;

/// Time of day the user wants to wake up (hour and minute, no date)
///
/// Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WakeTime(NaiveTime);

impl WakeTime {
    /// Build a wake time from clock components, `None` if not a valid clock time
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Build a wake time from any clock time, dropping seconds
    pub fn from_time(time: NaiveTime) -> Self {
        Self::new(time.hour(), time.minute()).unwrap_or_default()
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Seconds elapsed since midnight, always within `0..=86399`
    pub fn seconds_since_midnight(&self) -> u32 {
        self.hour() * 3600 + self.minute() * 60
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        self.0
    }
}

impl Default for WakeTime {
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default())
    }
}

impl fmt::Display for WakeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl TryFrom<String> for WakeTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map(Self::from_time)
            .map_err(|_| format!("Invalid wake time '{}', expected HH:MM", value))
    }
}

impl From<WakeTime> for String {
    fn from(value: WakeTime) -> Self {
        value.to_string()
    }
}

/// Desired amount of sleep, stored in quarter hours
///
/// Serialized as fractional hours (`7.75`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SleepAmount {
    quarters: u8,
}

impl SleepAmount {
    const MIN_QUARTERS: u8 = 16;
    const MAX_QUARTERS: u8 = 48;

    /// Exact conversion from hours; `None` when out of range or off the 0.25 grid
    pub fn from_hours(hours: f64) -> Option<Self> {
        if !hours.is_finite() {
            return None;
        }
        let quarters = hours * 4.0;
        if quarters.fract() != 0.0 {
            return None;
        }
        if quarters < f64::from(Self::MIN_QUARTERS) || quarters > f64::from(Self::MAX_QUARTERS) {
            return None;
        }
        Some(Self {
            quarters: quarters as u8,
        })
    }

    pub fn hours(&self) -> f64 {
        f64::from(self.quarters) / 4.0
    }

    /// One 0.25 h step up, saturating at the maximum
    pub fn increment(self) -> Self {
        Self {
            quarters: (self.quarters + 1).min(Self::MAX_QUARTERS),
        }
    }

    /// One 0.25 h step down, saturating at the minimum
    pub fn decrement(self) -> Self {
        Self {
            quarters: self.quarters.saturating_sub(1).max(Self::MIN_QUARTERS),
        }
    }

    /// Stepper label, e.g. "8 hours" or "7.25 hours"
    pub fn label(&self) -> String {
        format!("{} hours", self.hours())
    }
}

impl Default for SleepAmount {
    fn default() -> Self {
        Self { quarters: 32 }
    }
}

impl TryFrom<f64> for SleepAmount {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_hours(value).ok_or_else(|| {
            format!(
                "Sleep amount {} must be between {} and {} in steps of {}",
                value,
                FormConstraints::SLEEP_MIN_HOURS,
                FormConstraints::SLEEP_MAX_HOURS,
                FormConstraints::SLEEP_STEP_HOURS
            )
        })
    }
}

impl From<SleepAmount> for f64 {
    fn from(value: SleepAmount) -> Self {
        value.hours()
    }
}

/// Daily coffee intake in cups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CoffeeAmount(u8);

impl CoffeeAmount {
    pub fn new(cups: u32) -> Option<Self> {
        if (FormConstraints::COFFEE_MIN_CUPS..=FormConstraints::COFFEE_MAX_CUPS).contains(&cups) {
            Some(Self(cups as u8))
        } else {
            None
        }
    }

    pub fn cups(&self) -> u32 {
        u32::from(self.0)
    }

    pub fn increment(self) -> Self {
        Self::new(self.cups() + 1).unwrap_or(self)
    }

    pub fn decrement(self) -> Self {
        Self::new(self.cups().saturating_sub(1)).unwrap_or(self)
    }

    /// Stepper label, e.g. "1 cup" or "3 cups"
    pub fn label(&self) -> String {
        if self.0 > 1 {
            format!("{} cups", self.0)
        } else {
            format!("{} cup", self.0)
        }
    }
}

impl Default for CoffeeAmount {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u32> for CoffeeAmount {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "Coffee amount {} must be between {} and {} cups",
                value,
                FormConstraints::COFFEE_MIN_CUPS,
                FormConstraints::COFFEE_MAX_CUPS
            )
        })
    }
}

impl From<CoffeeAmount> for u32 {
    fn from(value: CoffeeAmount) -> Self {
        value.cups()
    }
}

/// Input handed to the bedtime estimator, built fresh for every calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimationRequest {
    wake_seconds: u32,
    sleep_hours: f64,
    coffee_cups: f64,
}

impl EstimationRequest {
    pub fn new(wake_time: WakeTime, sleep: SleepAmount, coffee: CoffeeAmount) -> Self {
        Self {
            wake_seconds: wake_time.seconds_since_midnight(),
            sleep_hours: sleep.hours(),
            coffee_cups: f64::from(coffee.cups()),
        }
    }

    pub fn wake_seconds(&self) -> u32 {
        self.wake_seconds
    }

    pub fn sleep_hours(&self) -> f64 {
        self.sleep_hours
    }

    pub fn coffee_cups(&self) -> f64 {
        self.coffee_cups
    }
}

/// Modal notification shown after a calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub const BEDTIME_TITLE: &'static str = "Your ideal bedtime is…";
    pub const FAILURE_TITLE: &'static str = "Error";
    pub const FAILURE_MESSAGE: &'static str =
        "Sorry, there was a problem calculating your bedtime.";

    pub fn bedtime(formatted: impl Into<String>) -> Self {
        Self {
            title: Self::BEDTIME_TITLE.to_string(),
            message: formatted.into(),
        }
    }

    pub fn failure() -> Self {
        Self {
            title: Self::FAILURE_TITLE.to_string(),
            message: Self::FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Terminal state of one calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationStatus {
    Resolved,
    Failed,
}

/// Result of a calculation as presented to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationOutcome {
    pub status: CalculationStatus,
    /// Formatted bedtime, present when resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedtime: Option<String>,
    /// Estimator output in seconds, present when resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_sleep_seconds: Option<f64>,
    pub alert: Alert,
}

impl CalculationOutcome {
    pub fn resolved(bedtime: String, required_sleep_seconds: f64) -> Self {
        Self {
            status: CalculationStatus::Resolved,
            alert: Alert::bedtime(bedtime.clone()),
            bedtime: Some(bedtime),
            required_sleep_seconds: Some(required_sleep_seconds),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: CalculationStatus::Failed,
            bedtime: None,
            required_sleep_seconds: None,
            alert: Alert::failure(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == CalculationStatus::Resolved
    }
}

/// User actions accepted by the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum FormAction {
    SetWakeTime(WakeTime),
    SetSleepAmount(f64),
    SetCoffeeAmount(u32),
    IncrementSleep,
    DecrementSleep,
    IncrementCoffee,
    DecrementCoffee,
    Calculate,
    DismissAlert,
}

/// Input DTO for a stateless bedtime estimate
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EstimateInput {
    pub wake_time: WakeTime,

    #[validate(range(min = 4.0, max = 12.0, message = "Sleep amount must be between 4 and 12 hours"))]
    pub sleep_amount: f64,

    #[validate(range(min = 1, max = 20, message = "Coffee amount must be between 1 and 20 cups"))]
    pub coffee_amount: u32,
}

/// Input DTO for setting the wake time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeTimeInput {
    pub wake_time: WakeTime,
}

/// Input DTO for setting the sleep amount directly
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SleepAmountInput {
    #[validate(range(min = 4.0, max = 12.0, message = "Sleep amount must be between 4 and 12 hours"))]
    pub hours: f64,
}

/// Input DTO for setting the coffee amount directly
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CoffeeAmountInput {
    #[validate(range(min = 1, max = 20, message = "Coffee amount must be between 1 and 20 cups"))]
    pub cups: u32,
}

/// WebSocket message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    /// Form state changed
    FormUpdate(FormSnapshot),
    /// Client-initiated form action
    Action(FormAction),
    /// Connection acknowledgment
    Connected { client_id: String },
    /// Error message
    Error { message: String },
    /// Heartbeat/ping
    Ping,
    /// Heartbeat/pong response
    Pong,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub estimator: String,
    pub clock_format: ClockFormat,
    pub connected_clients: usize,
    pub total_calculations: u64,
    pub failed_calculations: u64,
}
