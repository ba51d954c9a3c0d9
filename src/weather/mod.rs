//! Weather observations lined up with departure activity
//!
//! Hourly AMOS exports (wind, visibility, temperature, precipitation) and
//! snow observation exports share the `일시` time column. For a selected
//! day they are bucketed by clock hour and placed next to the hourly
//! departure profile, so delay counts and `ATD-RAM` can be read against the
//! conditions of the same hour.

use crate::config::defaults::HOURS_PER_DAY;
use crate::report::{HourlyProfile, TimeBasis};
use crate::types::RawRow;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Column names of the AMOS observation export.
pub mod columns {
    /// Observation time
    pub const OBSERVED_AT: &str = "일시";
    /// Wind speed, knots
    pub const WIND_SPEED: &str = "풍속(KT)";
    /// Visibility, metres
    pub const VISIBILITY: &str = "시정(m)";
    /// Air temperature, °C
    pub const TEMPERATURE: &str = "기온(°C)";
    /// Precipitation, mm
    pub const PRECIPITATION: &str = "강수량(mm)";
}

const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y%m%d%H%M",
];

/// Parse an observation time. A bare date reads as midnight.
pub fn parse_observation_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ============================================================================
// Observations
// ============================================================================

/// One weather observation. Measurements that are blank or non-numeric in
/// the export are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub observed_at: NaiveDateTime,
    pub wind_speed_kt: Option<f64>,
    pub visibility_m: Option<f64>,
    pub temperature_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
}

impl WeatherObservation {
    /// `None` when the observation time is missing or does not parse.
    pub fn from_row(row: &RawRow) -> Option<Self> {
        let observed_at = parse_observation_time(&row.text(columns::OBSERVED_AT)?)?;
        Some(Self {
            observed_at,
            wind_speed_kt: row.number(columns::WIND_SPEED),
            visibility_m: row.number(columns::VISIBILITY),
            temperature_c: row.number(columns::TEMPERATURE),
            precipitation_mm: row.number(columns::PRECIPITATION),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.observed_at.date()
    }

    pub fn hour(&self) -> u32 {
        self.observed_at.hour()
    }
}

/// Typed observations from raw rows, in input order. Rows without a usable
/// observation time are dropped with a warning.
pub fn observations_from_rows(rows: &[RawRow]) -> Vec<WeatherObservation> {
    let observations: Vec<WeatherObservation> =
        rows.iter().filter_map(WeatherObservation::from_row).collect();
    let skipped = rows.len() - observations.len();
    if skipped > 0 {
        warn!(skipped, kept = observations.len(), "Weather rows without a valid observation time");
    }
    observations
}

/// Clock hours of `date` with at least one snow observation.
pub fn snow_hours(snow: &[WeatherObservation], date: NaiveDate) -> BTreeSet<u32> {
    snow.iter()
        .filter(|o| o.date() == date)
        .map(WeatherObservation::hour)
        .collect()
}

// ============================================================================
// Hourly alignment
// ============================================================================

/// Observations of one clock hour, each measurement averaged over the
/// observations that report it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub observations: usize,
    pub wind_speed_kt: Option<f64>,
    pub visibility_m: Option<f64>,
    pub temperature_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
}

impl HourlyWeather {
    fn from_observations(observations: &[&WeatherObservation]) -> Option<Self> {
        if observations.is_empty() {
            return None;
        }
        let mean_of = |field: fn(&WeatherObservation) -> Option<f64>| {
            let values: Vec<f64> = observations.iter().filter_map(|o| field(o)).collect();
            (!values.is_empty()).then(|| values.iter().mean())
        };
        Some(Self {
            observations: observations.len(),
            wind_speed_kt: mean_of(|o| o.wind_speed_kt),
            visibility_m: mean_of(|o| o.visibility_m),
            temperature_c: mean_of(|o| o.temperature_c),
            precipitation_mm: mean_of(|o| o.precipitation_mm),
        })
    }
}

/// Departure activity and weather for one clock hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyConditions {
    pub hour: u32,
    pub flights: usize,
    pub delayed: usize,
    pub mean_atd_ram_minutes: Option<f64>,
    /// `None` when the hour has no observation
    pub weather: Option<HourlyWeather>,
    pub snow: bool,
}

/// 24 hours of one day with departures, weather and snow side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayConditions {
    pub date: NaiveDate,
    pub basis: TimeBasis,
    pub hours: Vec<HourlyConditions>,
    pub snow_hours: BTreeSet<u32>,
}

impl DayConditions {
    /// Join the day's hourly profile with the observations that fall on
    /// `date`. Observations of other days are ignored, so whole-year
    /// exports can be passed as they are.
    pub fn align(
        date: NaiveDate,
        profile: &HourlyProfile,
        weather: &[WeatherObservation],
        snow: &[WeatherObservation],
    ) -> Self {
        let mut by_hour: Vec<Vec<&WeatherObservation>> = vec![Vec::new(); HOURS_PER_DAY];
        for observation in weather.iter().filter(|o| o.date() == date) {
            by_hour[observation.hour() as usize].push(observation);
        }
        let snow_hours = snow_hours(snow, date);

        let hours = profile
            .buckets
            .iter()
            .map(|bucket| HourlyConditions {
                hour: bucket.hour,
                flights: bucket.flights,
                delayed: bucket.delayed,
                mean_atd_ram_minutes: bucket.mean_atd_ram_minutes,
                weather: by_hour
                    .get(bucket.hour as usize)
                    .and_then(|obs| HourlyWeather::from_observations(obs)),
                snow: snow_hours.contains(&bucket.hour),
            })
            .collect();

        debug!(%date, snow_hours = snow_hours.len(), "Weather aligned with hourly profile");
        Self {
            date,
            basis: profile.basis,
            hours,
            snow_hours,
        }
    }

    /// Whether any hour of the day has a weather observation.
    pub fn has_weather(&self) -> bool {
        self.hours.iter().any(|h| h.weather.is_some())
    }

    /// Hours with departures or observations.
    pub fn active(&self) -> impl Iterator<Item = &HourlyConditions> {
        self.hours
            .iter()
            .filter(|h| h.flights > 0 || h.weather.is_some() || h.snow)
    }
}
