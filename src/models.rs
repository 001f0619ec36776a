use crate::errors::ValidationError;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_METRIC: &str = "Weight";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Date,
    Metric,
    Value,
}

impl Field {
    /// Column header used for this field in the backing file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Metric => "Metric",
            Self::Value => "Value",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (date, metric, value) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub date: NaiveDate,
    pub metric: String,
    pub value: f64,
}

impl Record {
    pub fn new(date: NaiveDate, metric: impl Into<String>, value: f64) -> Self {
        Self {
            date,
            metric: metric.into(),
            value,
        }
    }

    /// Drops whitespace around the metric name; stored tables are read back trimmed.
    pub fn normalized(mut self) -> Self {
        self.metric = self.metric.trim().to_string();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_metric(&self.metric)?;
        validate_value(self.value)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl From<&Record> for SeriesPoint {
    fn from(record: &Record) -> Self {
        Self {
            date: record.date,
            value: record.value,
        }
    }
}

/// Raw text of an entry form, before any parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryForm {
    pub metric: String,
    pub value: String,
    #[serde(default)]
    pub date: Option<String>,
}

impl EntryForm {
    pub fn new(metric: impl Into<String>, value: impl Into<String>, date: Option<String>) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
            date,
        }
    }

    /// Parses every field, defaulting a blank date to today.
    pub fn parse(&self) -> Result<(NaiveDate, String, f64), ValidationError> {
        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => Local::now().date_naive(),
            Some(raw) => parse_date(raw)?,
        };

        let metric = self.metric.trim();
        validate_metric(metric)?;

        let value = parse_value(&self.value)?;

        Ok((date, metric.to_string(), value))
    }
}

pub fn validate_metric(metric: &str) -> Result<(), ValidationError> {
    if metric.trim().is_empty() {
        return Err(ValidationError::new(Field::Metric, "metric name must not be empty"));
    }
    Ok(())
}

pub fn validate_value(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new(
            Field::Value,
            format!("value must be a finite number, got {}", value),
        ));
    }
    Ok(())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        ValidationError::new(
            Field::Date,
            format!("'{}' is not a date in YYYY-MM-DD form", raw.trim()),
        )
    })
}

pub fn parse_value(raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| ValidationError::new(Field::Value, format!("'{}' is not a number", trimmed)))?;
    validate_value(value)?;
    Ok(value)
}
