//! CSV codec for the `Date,Metric,Value` table.

use crate::errors::{AppError, AppResult, ValidationError};
use crate::models::{Field, Record, DATE_FORMAT};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::{Read, Write};

pub const COLUMNS: [Field; 3] = [Field::Date, Field::Metric, Field::Value];

const LEGACY_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

struct ColumnIndex {
    date: usize,
    metric: usize,
    value: usize,
}

/// Reads every data row of a table.
///
/// Structural problems (missing columns, ragged rows, unreadable input) fail the
/// whole read. Cells that do not parse are returned per row so callers decide
/// whether a bad row is fatal. Record invariants are not checked here.
pub fn read_rows<R: Read>(reader: R) -> AppResult<Vec<Result<Record, ValidationError>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = locate_columns(csv_reader.headers()?)?;

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let row = result?;
        rows.push(decode_row(&row, &columns));
    }
    Ok(rows)
}

pub fn write_rows<W: Write>(writer: W, records: &[Record]) -> AppResult<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(COLUMNS.iter().map(|field| field.as_str()))?;
    for record in records {
        csv_writer.write_record([
            record.date.format(DATE_FORMAT).to_string(),
            record.metric.clone(),
            record.value.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string(records: &[Record]) -> AppResult<String> {
    let mut buffer = Vec::new();
    write_rows(&mut buffer, records)?;
    String::from_utf8(buffer).map_err(|error| AppError::Internal(error.to_string()))
}

fn locate_columns(headers: &csv::StringRecord) -> AppResult<ColumnIndex> {
    let position = |field: Field| headers.iter().position(|header| header == field.as_str());

    let missing = COLUMNS
        .iter()
        .filter(|field| position(**field).is_none())
        .map(|field| field.as_str())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(AppError::MalformedFile(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    match (position(Field::Date), position(Field::Metric), position(Field::Value)) {
        (Some(date), Some(metric), Some(value)) => Ok(ColumnIndex { date, metric, value }),
        _ => Err(AppError::Internal("column lookup disagreed with header check".to_string())),
    }
}

fn decode_row(row: &csv::StringRecord, columns: &ColumnIndex) -> Result<Record, ValidationError> {
    let cell = |index: usize| row.get(index).unwrap_or_default();

    let date = parse_date_cell(cell(columns.date))?;
    let metric = cell(columns.metric).to_string();
    let raw_value = cell(columns.value);
    let value = raw_value
        .parse::<f64>()
        .map_err(|_| ValidationError::new(Field::Value, format!("'{}' is not a number", raw_value)))?;

    Ok(Record { date, metric, value })
}

/// Accepts plain dates and the midnight timestamps older files contain.
fn parse_date_cell(raw: &str) -> Result<NaiveDate, ValidationError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(date);
    }
    LEGACY_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|timestamp| timestamp.date())
        .ok_or_else(|| ValidationError::new(Field::Date, format!("'{}' is not a date in YYYY-MM-DD form", raw)))
}
