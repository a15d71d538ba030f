//! Bedtime Estimator
//!
//! ══════════════════════════════════════════════════════════════════════════════
//! SINGLE SOURCE OF SLEEP PREDICTIONS
//! ══════════════════════════════════════════════════════════════════════════════
//!
//! Every prediction in the system goes through [`BedtimeEstimator`]. The
//! contract is three numbers in, one number out:
//!
//! ```text
//! predict(wake: seconds since midnight, estimatedSleep: hours, coffee: cups)
//!     -> actualSleep: seconds
//! ```
//!
//! Two backends ship with the service:
//! 1. [`LinearSleepModel`] - in-process linear regression with built-in coefficients
//! 2. [`ArtifactEstimator`] - reads a pre-trained model artifact from disk on every call
//!
//! Any other inference runtime can be plugged in by implementing the trait,
//! as long as the units above are preserved.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::EstimationRequest;

/// Artifact kind understood by [`ArtifactEstimator`]
pub const LINEAR_REGRESSION_KIND: &str = "linear_regression";

/// Artifact schema version understood by [`ArtifactEstimator`]
pub const ARTIFACT_VERSION: u32 = 1;

/// Any fault raised while invoking an estimator.
///
/// The variant is kept for logs only; users see one fixed message.
#[derive(Debug, Error)]
pub enum EstimationFailure {
    #[error("Model artifact unavailable: {0}")]
    ArtifactUnavailable(String),

    #[error("Malformed model artifact: {0}")]
    MalformedArtifact(String),

    #[error("Inference fault: {0}")]
    InferenceFault(String),
}

/// Narrow capability over whatever produces sleep predictions
pub trait BedtimeEstimator: Send + Sync + fmt::Debug {
    /// Predicted seconds of sleep actually needed
    fn estimate(&self, request: &EstimationRequest) -> Result<f64, EstimationFailure>;

    /// Short backend name for logs and health output
    fn name(&self) -> &str;
}

/// Linear regression over the three model features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearSleepModel {
    /// Seconds
    pub intercept: f64,
    /// Seconds of sleep per second of wake time
    pub wake: f64,
    /// Seconds of sleep per desired hour
    pub estimated_sleep: f64,
    /// Seconds of sleep per daily cup
    pub coffee: f64,
}

impl LinearSleepModel {
    pub fn predict(&self, wake: f64, estimated_sleep: f64, coffee: f64) -> f64 {
        self.intercept + self.wake * wake + self.estimated_sleep * estimated_sleep + self.coffee * coffee
    }
}

impl Default for LinearSleepModel {
    /// Built-in coefficients: the desired hours, plus 15 minutes to fall
    /// asleep, plus 4 minutes per daily cup of coffee.
    fn default() -> Self {
        Self {
            intercept: 900.0,
            wake: 0.0,
            estimated_sleep: 3600.0,
            coffee: 240.0,
        }
    }
}

impl BedtimeEstimator for LinearSleepModel {
    fn estimate(&self, request: &EstimationRequest) -> Result<f64, EstimationFailure> {
        let prediction = self.predict(
            f64::from(request.wake_seconds()),
            request.sleep_hours(),
            request.coffee_cups(),
        );

        if !prediction.is_finite() || prediction <= 0.0 {
            return Err(EstimationFailure::InferenceFault(format!(
                "prediction {} is not a positive duration",
                prediction
            )));
        }

        debug!(
            wake_seconds = request.wake_seconds(),
            sleep_hours = request.sleep_hours(),
            coffee_cups = request.coffee_cups(),
            required_sleep_seconds = prediction,
            "Linear model prediction"
        );

        Ok(prediction)
    }

    fn name(&self) -> &str {
        "linear"
    }
}

/// On-disk model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: String,
    pub version: u32,
    pub coefficients: LinearSleepModel,
}

/// Estimator backed by a model artifact file.
///
/// The artifact is read on every call, so replacing the file takes effect on
/// the next calculation and a missing file surfaces as a calculation failure.
#[derive(Debug, Clone)]
pub struct ArtifactEstimator {
    path: PathBuf,
}

impl ArtifactEstimator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load and check the artifact
    pub fn load(&self) -> Result<LinearSleepModel, EstimationFailure> {
        read_artifact(&self.path)
            .map(|artifact| artifact.coefficients)
            .map_err(|err| {
                let detail = format!("{:#}", err);
                if err.downcast_ref::<io::Error>().is_some() {
                    EstimationFailure::ArtifactUnavailable(detail)
                } else {
                    EstimationFailure::MalformedArtifact(detail)
                }
            })
    }
}

fn read_artifact(path: &Path) -> anyhow::Result<ModelArtifact> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading model artifact {}", path.display()))?;
    let artifact: ModelArtifact = serde_json::from_str(&text)
        .with_context(|| format!("parsing model artifact {}", path.display()))?;

    if artifact.kind != LINEAR_REGRESSION_KIND {
        bail!("unsupported model kind '{}'", artifact.kind);
    }
    if artifact.version != ARTIFACT_VERSION {
        bail!(
            "unsupported artifact version {} (expected {})",
            artifact.version,
            ARTIFACT_VERSION
        );
    }

    Ok(artifact)
}

impl BedtimeEstimator for ArtifactEstimator {
    fn estimate(&self, request: &EstimationRequest) -> Result<f64, EstimationFailure> {
        self.load()?.estimate(request)
    }

    fn name(&self) -> &str {
        "artifact"
    }
}

/// Pick the backend for the configured artifact path
pub fn from_model_path(path: Option<&Path>) -> Arc<dyn BedtimeEstimator> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Using model artifact estimator");
            Arc::new(ArtifactEstimator::new(path))
        }
        None => {
            info!("No model artifact configured, using built-in linear model");
            Arc::new(LinearSleepModel::default())
        }
    }
}

/// Deterministic estimators for tests
#[cfg(test)]
pub mod testing {
    use super::*;

    /// Always predicts the same duration
    #[derive(Debug)]
    pub struct FixedEstimator(pub f64);

    impl BedtimeEstimator for FixedEstimator {
        fn estimate(&self, _request: &EstimationRequest) -> Result<f64, EstimationFailure> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// Faults on every input
    #[derive(Debug)]
    pub struct FailingEstimator;

    impl BedtimeEstimator for FailingEstimator {
        fn estimate(&self, _request: &EstimationRequest) -> Result<f64, EstimationFailure> {
            Err(EstimationFailure::InferenceFault("stub failure".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }
}
