//! Enumerations and small value types shared across the pipeline stages

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Movement status
// ============================================================================

/// Movement status code as reported in the `STS` column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlightStatus {
    /// Departed
    #[default]
    Dep,
    /// Delayed
    Dla,
    /// Cancelled
    Cnl,
    /// Diverted
    Div,
}

impl FlightStatus {
    /// Status from an optional `STS` cell. Absent or unrecognised codes
    /// resolve to `DEP`.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            None => Self::default(),
            Some(code) => code.parse().unwrap_or_else(|()| {
                tracing::debug!(code = %code, "Unrecognised STS code, treating as DEP");
                Self::default()
            }),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            FlightStatus::Dep => "DEP",
            FlightStatus::Dla => "DLA",
            FlightStatus::Cnl => "CNL",
            FlightStatus::Div => "DIV",
        }
    }
}

impl FromStr for FlightStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEP" => Ok(FlightStatus::Dep),
            "DLA" => Ok(FlightStatus::Dla),
            "CNL" => Ok(FlightStatus::Cnl),
            "DIV" => Ok(FlightStatus::Div),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// Delay cause
// ============================================================================

/// Dominant cause assigned to a departure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DelayCause {
    Normal,
    /// Held at the stand: late pushback
    RampGate,
    /// Held on the ground between pushback and take-off
    TaxiGround,
}

impl DelayCause {
    pub const ALL: [DelayCause; 3] = [DelayCause::Normal, DelayCause::RampGate, DelayCause::TaxiGround];

    /// Label used on dashboards and legends.
    pub fn label(self) -> &'static str {
        match self {
            DelayCause::Normal => "Normal",
            DelayCause::RampGate => "Ramp (Gate)",
            DelayCause::TaxiGround => "Taxi (Ground)",
        }
    }
}

impl fmt::Display for DelayCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Calendar month key
// ============================================================================

/// Calendar year-month, the grouping key of taxi-time baselines.
///
/// Serializes as `"YYYY-MM"` so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
        let year = year.parse::<i32>().map_err(|e| format!("bad year in '{s}': {e}"))?;
        let month = month.parse::<u32>().map_err(|e| format!("bad month in '{s}': {e}"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in '{s}'"));
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tri-state derived value
// ============================================================================

/// A derived value that is either not computed yet, could not be computed
/// from its source, or present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Resolved<T> {
    Pending,
    Unparseable,
    Value(T),
}

impl<T> Default for Resolved<T> {
    fn default() -> Self {
        Resolved::Pending
    }
}

impl<T> Resolved<T> {
    /// Collapse a parse result: any error becomes `Unparseable`.
    pub fn from_result<E>(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Resolved::Value(v),
            Err(_) => Resolved::Unparseable,
        }
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Resolved::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Resolved::Value(_))
    }

    pub fn is_unparseable(&self) -> bool {
        matches!(self, Resolved::Unparseable)
    }
}

impl<T: Copy> Resolved<T> {
    pub fn value(&self) -> Option<T> {
        self.as_ref().copied()
    }
}

impl<T> From<Option<T>> for Resolved<T> {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Resolved::Unparseable, Resolved::Value)
    }
}
