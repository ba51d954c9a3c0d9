//! Untyped input rows as handed over by the CSV/dataframe layer

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// Column names of the ramp-operations export.
pub mod columns {
    /// Flight number
    pub const FLIGHT: &str = "FLT";
    /// Stand / parking spot
    pub const STAND: &str = "SPT";
    /// Schedule date, `YYMMDD`
    pub const DATE: &str = "Date";
    /// Scheduled time of departure, `HH:MM`
    pub const STD: &str = "STD";
    /// Ramp-out (pushback) time, `HH:MM`
    pub const RAM: &str = "RAM";
    /// Actual time of departure, `HH:MM`
    pub const ATD: &str = "ATD";
    /// Precomputed taxi minutes (ATD minus RAM)
    pub const TAXI_MINUTES: &str = "ATD-RAM";
    /// Movement status code
    pub const STATUS: &str = "STS";
    /// Destination airport
    pub const DESTINATION: &str = "DES";
}

/// A single cell value. Dataframe exports mix text and numbers freely, so
/// both are accepted wherever a column is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Textual form of the cell, trimmed. Blank text and non-finite numbers
    /// (the dataframe notion of "missing") yield `None`.
    ///
    /// Integral numbers render without a fractional part so that a numeric
    /// `Date` cell `250103.0` reads back as `"250103"`.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Cow::Borrowed(trimmed))
                }
            }
            RawValue::Number(n) if !n.is_finite() => None,
            RawValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(Cow::Owned(format!("{}", *n as i64)))
            }
            RawValue::Number(n) => Some(Cow::Owned(n.to_string())),
        }
    }

    /// Numeric form of the cell, if it holds a finite number or text that
    /// parses as one.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

/// One source row: column name → cell value. Absent columns and blank
/// cells are indistinguishable to readers of the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(HashMap<String, RawValue>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(column.into(), value.into());
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Trimmed, non-blank text of a column.
    pub fn text(&self, column: &str) -> Option<Cow<'_, str>> {
        self.0.get(column).and_then(RawValue::as_text)
    }

    /// Owned text of a column, empty string when absent.
    pub fn text_or_empty(&self, column: &str) -> String {
        self.text(column).map(Cow::into_owned).unwrap_or_default()
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.0.get(column).and_then(RawValue::as_f64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_date_renders_as_integer_text() {
        let v = RawValue::Number(250103.0);
        assert_eq!(v.as_text().as_deref(), Some("250103"));
    }

    #[test]
    fn test_blank_and_nan_are_missing() {
        assert!(RawValue::from("   ").as_text().is_none());
        assert!(RawValue::Number(f64::NAN).as_text().is_none());
        assert!(RawValue::Number(f64::NAN).as_f64().is_none());
    }

    #[test]
    fn test_text_number_parses() {
        assert_eq!(RawValue::from(" 17.5 ").as_f64(), Some(17.5));
        assert_eq!(RawValue::from("n/a").as_f64(), None);
    }

    #[test]
    fn test_row_accessors() {
        let row = RawRow::new()
            .with(columns::FLIGHT, "KE123")
            .with(columns::TAXI_MINUTES, 22.0);
        assert_eq!(row.text(columns::FLIGHT).as_deref(), Some("KE123"));
        assert_eq!(row.number(columns::TAXI_MINUTES), Some(22.0));
        assert_eq!(row.text_or_empty(columns::DESTINATION), "");
        assert!(!row.contains(columns::STATUS));
    }
}
