//! Configuration management module
//!
//! Loads and validates environment-based configuration.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::bedtime::ClockFormat;

/// Configuration errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid number format in environment variable {0}")]
    ParseError(&'static str),

    #[error("Invalid CLOCK_FORMAT: {0}")]
    InvalidClockFormat(String),
}

/// Server configuration settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Estimator configuration settings
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    /// Path of the model artifact; the built-in model is used when unset
    pub path: Option<PathBuf>,
}

/// Presentation settings
#[derive(Debug, Clone, Deserialize)]
pub struct DisplaySettings {
    pub clock_format: ClockFormat,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub display: DisplaySettings,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("SERVER_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .map_err(|_| SettingsError::ParseError("SERVER_PORT"))?;

        let clock_format = match lookup("CLOCK_FORMAT").filter(|v| !v.trim().is_empty()) {
            Some(value) => value.parse::<ClockFormat>().map_err(SettingsError::InvalidClockFormat)?,
            None => lookup("LC_TIME")
                .or_else(|| lookup("LANG"))
                .map(|tag| ClockFormat::from_locale(&tag))
                .unwrap_or_default(),
        };

        Ok(Self {
            server: ServerSettings {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
                port,
            },
            model: ModelSettings {
                path: lookup("MODEL_PATH")
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from),
            },
            display: DisplaySettings { clock_format },
        })
    }
}
