//! Bedtime form (input collector)
//!
//! Holds the three inputs of the single screen and the alert produced by the
//! last calculation. Every user action goes through [`BedtimeForm::apply`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bedtime::{bedtime, ClockFormat};
use crate::error::AppResult;
use crate::estimator::BedtimeEstimator;
use crate::models::{
    Alert, CalculationOutcome, CoffeeAmount, EstimationRequest, FormAction, SleepAmount, WakeTime,
};
use crate::validation::{validate_coffee_cups, validate_sleep_hours, FormConstraints};

pub const SCREEN_TITLE: &str = "BetterRest";
pub const WAKE_PROMPT: &str = "When do you want to wake up?";
pub const SLEEP_PROMPT: &str = "Desired amount of sleep";
pub const COFFEE_PROMPT: &str = "Daily coffee intake";
pub const CALCULATE_LABEL: &str = "Calculate";

/// Current values of the form plus the alert surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BedtimeForm {
    wake_time: WakeTime,
    sleep_amount: SleepAmount,
    coffee_amount: CoffeeAmount,
    alert: Option<Alert>,
    showing_alert: bool,
    /// Bumped on every visible change
    revision: u64,
}

impl BedtimeForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form pre-filled with already validated inputs
    pub fn with_inputs(wake_time: WakeTime, sleep_amount: SleepAmount, coffee_amount: CoffeeAmount) -> Self {
        Self {
            wake_time,
            sleep_amount,
            coffee_amount,
            ..Self::default()
        }
    }

    pub fn wake_time(&self) -> WakeTime {
        self.wake_time
    }

    pub fn sleep_amount(&self) -> SleepAmount {
        self.sleep_amount
    }

    pub fn coffee_amount(&self) -> CoffeeAmount {
        self.coffee_amount
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn showing_alert(&self) -> bool {
        self.showing_alert
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn set_wake_time(&mut self, wake_time: WakeTime) {
        if self.wake_time != wake_time {
            self.wake_time = wake_time;
            self.touch();
        }
    }

    fn set_sleep(&mut self, sleep_amount: SleepAmount) {
        if self.sleep_amount != sleep_amount {
            self.sleep_amount = sleep_amount;
            self.touch();
        }
    }

    fn set_coffee(&mut self, coffee_amount: CoffeeAmount) {
        if self.coffee_amount != coffee_amount {
            self.coffee_amount = coffee_amount;
            self.touch();
        }
    }

    pub fn increment_sleep(&mut self) {
        self.set_sleep(self.sleep_amount.increment());
    }

    pub fn decrement_sleep(&mut self) {
        self.set_sleep(self.sleep_amount.decrement());
    }

    pub fn increment_coffee(&mut self) {
        self.set_coffee(self.coffee_amount.increment());
    }

    pub fn decrement_coffee(&mut self) {
        self.set_coffee(self.coffee_amount.decrement());
    }

    /// Direct assignment; out-of-range values are rejected and the form is left unchanged
    pub fn set_sleep_amount(&mut self, hours: f64) -> AppResult<()> {
        let sleep_amount = validate_sleep_hours(hours)?;
        self.set_sleep(sleep_amount);
        Ok(())
    }

    /// Direct assignment; out-of-range values are rejected and the form is left unchanged
    pub fn set_coffee_amount(&mut self, cups: u32) -> AppResult<()> {
        let coffee_amount = validate_coffee_cups(cups)?;
        self.set_coffee(coffee_amount);
        Ok(())
    }

    pub fn dismiss_alert(&mut self) {
        if self.showing_alert {
            self.showing_alert = false;
            self.touch();
        }
    }

    /// Snapshot of the inputs as the estimator sees them
    pub fn request(&self) -> EstimationRequest {
        EstimationRequest::new(self.wake_time, self.sleep_amount, self.coffee_amount)
    }

    /// Run one estimation and show its result.
    ///
    /// Any estimator fault becomes the fixed failure alert; the previous alert
    /// is always replaced.
    pub fn calculate(&mut self, estimator: &dyn BedtimeEstimator, clock: ClockFormat) -> CalculationOutcome {
        let request = self.request();
        debug!(
            estimator = estimator.name(),
            wake_seconds = request.wake_seconds(),
            sleep_hours = request.sleep_hours(),
            coffee_cups = request.coffee_cups(),
            "Calculating bedtime"
        );

        let outcome = match estimator.estimate(&request) {
            Ok(required_sleep_seconds)
                if required_sleep_seconds.is_finite() && required_sleep_seconds > 0.0 =>
            {
                let formatted = clock.format(bedtime(self.wake_time, required_sleep_seconds));
                info!(
                    bedtime = %formatted,
                    required_sleep_seconds = required_sleep_seconds,
                    "Bedtime calculated"
                );
                CalculationOutcome::resolved(formatted, required_sleep_seconds)
            }
            Ok(required_sleep_seconds) => {
                warn!(
                    estimator = estimator.name(),
                    required_sleep_seconds = required_sleep_seconds,
                    "Estimator returned a non-positive or non-finite duration"
                );
                CalculationOutcome::failed()
            }
            Err(failure) => {
                warn!(estimator = estimator.name(), error = %failure, "Bedtime estimation failed");
                CalculationOutcome::failed()
            }
        };

        self.alert = Some(outcome.alert.clone());
        self.showing_alert = true;
        self.touch();

        outcome
    }

    /// Handle one user action. Returns the outcome when the action was a calculation.
    pub fn apply(
        &mut self,
        action: FormAction,
        estimator: &dyn BedtimeEstimator,
        clock: ClockFormat,
    ) -> AppResult<Option<CalculationOutcome>> {
        match action {
            FormAction::SetWakeTime(wake_time) => self.set_wake_time(wake_time),
            FormAction::SetSleepAmount(hours) => self.set_sleep_amount(hours)?,
            FormAction::SetCoffeeAmount(cups) => self.set_coffee_amount(cups)?,
            FormAction::IncrementSleep => self.increment_sleep(),
            FormAction::DecrementSleep => self.decrement_sleep(),
            FormAction::IncrementCoffee => self.increment_coffee(),
            FormAction::DecrementCoffee => self.decrement_coffee(),
            FormAction::DismissAlert => self.dismiss_alert(),
            FormAction::Calculate => return Ok(Some(self.calculate(estimator, clock))),
        }
        Ok(None)
    }

    pub fn snapshot(&self, clock: ClockFormat) -> FormSnapshot {
        FormSnapshot {
            title: SCREEN_TITLE.to_string(),
            wake_prompt: WAKE_PROMPT.to_string(),
            wake_time: self.wake_time(),
            wake_time_label: clock.format(self.wake_time().as_naive_time()),
            sleep_prompt: SLEEP_PROMPT.to_string(),
            sleep_amount: self.sleep_amount().hours(),
            sleep_label: self.sleep_amount().label(),
            sleep_bounds: StepperBounds {
                min: FormConstraints::SLEEP_MIN_HOURS,
                max: FormConstraints::SLEEP_MAX_HOURS,
                step: FormConstraints::SLEEP_STEP_HOURS,
            },
            coffee_prompt: COFFEE_PROMPT.to_string(),
            coffee_amount: self.coffee_amount().cups(),
            coffee_label: self.coffee_amount().label(),
            coffee_bounds: StepperBounds {
                min: f64::from(FormConstraints::COFFEE_MIN_CUPS),
                max: f64::from(FormConstraints::COFFEE_MAX_CUPS),
                step: 1.0,
            },
            calculate_label: CALCULATE_LABEL.to_string(),
            clock_format: clock,
            alert: self.alert().cloned(),
            showing_alert: self.showing_alert(),
            revision: self.revision(),
        }
    }
}

/// Range and step of a stepper control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepperBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Everything a client needs to render the screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub title: String,
    pub wake_prompt: String,
    pub wake_time: WakeTime,
    pub wake_time_label: String,
    pub sleep_prompt: String,
    pub sleep_amount: f64,
    pub sleep_label: String,
    pub sleep_bounds: StepperBounds,
    pub coffee_prompt: String,
    pub coffee_amount: u32,
    pub coffee_label: String,
    pub coffee_bounds: StepperBounds,
    pub calculate_label: String,
    pub clock_format: ClockFormat,
    pub alert: Option<Alert>,
    pub showing_alert: bool,
    pub revision: u64,
}
