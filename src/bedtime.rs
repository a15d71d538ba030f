//! Bedtime arithmetic and clock formatting
//!
//! Kept free of HTTP and estimator concerns so it can be tested on its own.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::WakeTime;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// How clock times are rendered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockFormat {
    /// "23:30"
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
    /// "11:30 PM"
    #[serde(rename = "12h")]
    TwelveHour,
}

impl ClockFormat {
    /// Locales whose short time style uses a 12-hour clock
    const TWELVE_HOUR_LOCALES: [&'static str; 6] =
        ["en", "en_US", "en_CA", "en_AU", "en_PH", "en_IN"];

    /// Render hours and minutes only
    pub fn format(self, time: NaiveTime) -> String {
        match self {
            ClockFormat::TwentyFourHour => time.format("%H:%M").to_string(),
            ClockFormat::TwelveHour => time.format("%-I:%M %p").to_string(),
        }
    }

    /// Resolve from a POSIX locale tag such as `en_US.UTF-8` or `pt-BR`
    pub fn from_locale(tag: &str) -> Self {
        let language = tag
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .replace('-', "_");

        if Self::TWELVE_HOUR_LOCALES.contains(&language.as_str()) {
            ClockFormat::TwelveHour
        } else {
            ClockFormat::TwentyFourHour
        }
    }
}

impl fmt::Display for ClockFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockFormat::TwentyFourHour => write!(f, "24h"),
            ClockFormat::TwelveHour => write!(f, "12h"),
        }
    }
}

impl FromStr for ClockFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "24h" | "24" => Ok(ClockFormat::TwentyFourHour),
            "12h" | "12" => Ok(ClockFormat::TwelveHour),
            other => Err(format!("unknown clock format '{}'", other)),
        }
    }
}

/// Wake time minus the required sleep, wrapping around midnight.
///
/// Fractional seconds are truncated. Callers pass a finite duration; whole
/// days are dropped since only the time of day is shown.
pub fn bedtime(wake_time: WakeTime, required_sleep_seconds: f64) -> NaiveTime {
    let seconds = (required_sleep_seconds.trunc() as i64).rem_euclid(SECONDS_PER_DAY);
    wake_time.as_naive_time() - Duration::seconds(seconds)
}
