//! Application state management
//!
//! Central state container for the BetterRest service: the single form, the
//! estimator backend and the connected WebSocket observers.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::bedtime::ClockFormat;
use crate::error::AppResult;
use crate::estimator::BedtimeEstimator;
use crate::form::{BedtimeForm, FormSnapshot};
use crate::models::{CalculationOutcome, FormAction};

/// Central application state
#[derive(Debug)]
pub struct AppState {
    /// The one form of the screen
    form: BedtimeForm,
    /// Prediction backend
    estimator: Arc<dyn BedtimeEstimator>,
    /// How times are rendered
    clock_format: ClockFormat,
    /// Application start time
    start_time: DateTime<Utc>,
    /// Calculations run, stateless estimates included
    total_calculations: u64,
    /// Calculations that ended in the failure alert
    failed_calculations: u64,
    /// Connected WebSocket clients
    connected_clients: Vec<String>,
}

impl AppState {
    /// Create new application state
    pub fn new(estimator: Arc<dyn BedtimeEstimator>, clock_format: ClockFormat) -> Self {
        info!(
            estimator = estimator.name(),
            clock_format = %clock_format,
            "Initializing application state"
        );
        Self {
            form: BedtimeForm::new(),
            estimator,
            clock_format,
            start_time: Utc::now(),
            total_calculations: 0,
            failed_calculations: 0,
            connected_clients: Vec::new(),
        }
    }

    /// Render the current form
    pub fn snapshot(&self) -> FormSnapshot {
        self.form.snapshot(self.clock_format)
    }

    /// Revision of the form, used by observers to detect changes
    pub fn revision(&self) -> u64 {
        self.form.revision()
    }

    /// Apply a user action to the form
    pub fn apply(&mut self, action: FormAction) -> AppResult<Option<CalculationOutcome>> {
        debug!(action = ?action, revision = self.form.revision(), "Applying form action");

        let outcome = self.form.apply(action, self.estimator.as_ref(), self.clock_format)?;
        if let Some(outcome) = &outcome {
            self.record(outcome);
        }
        Ok(outcome)
    }

    /// Calculate on a throwaway form without touching the screen state
    pub fn estimate_detached(&mut self, mut form: BedtimeForm) -> CalculationOutcome {
        let outcome = form.calculate(self.estimator.as_ref(), self.clock_format);
        self.record(&outcome);
        outcome
    }

    fn record(&mut self, outcome: &CalculationOutcome) {
        self.total_calculations += 1;
        if !outcome.is_resolved() {
            self.failed_calculations += 1;
        }
    }

    pub fn estimator_name(&self) -> &str {
        self.estimator.name()
    }

    pub fn clock_format(&self) -> ClockFormat {
        self.clock_format
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.start_time).num_seconds() as u64
    }

    pub fn total_calculations(&self) -> u64 {
        self.total_calculations
    }

    pub fn failed_calculations(&self) -> u64 {
        self.failed_calculations
    }

    /// Register a new WebSocket client
    pub fn add_client(&mut self, client_id: String) {
        info!(client_id = %client_id, "WebSocket client connected");
        self.connected_clients.push(client_id);
    }

    /// Remove a WebSocket client
    pub fn remove_client(&mut self, client_id: &str) {
        info!(client_id = %client_id, "WebSocket client disconnected");
        self.connected_clients.retain(|id| id != client_id);
    }

    /// Get count of connected clients
    pub fn client_count(&self) -> usize {
        self.connected_clients.len()
    }
}
