use crate::models::Field;
use serde::Serialize;
use thiserror::Error;

/// A single rejected input field, optionally tied to a row of a bulk upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{}{}: {}", .row.map(|index| format!("row {}: ", index)).unwrap_or_default(), .field, .message)]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
}

impl ValidationError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            row: None,
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("VALIDATION: {0}")]
    Validation(ValidationError),
    #[error("VALIDATION: {} record(s) rejected", .0.len())]
    Rejected(Vec<ValidationError>),
    #[error("MALFORMED_FILE: {0}")]
    MalformedFile(String),
    #[error("PARSE: {0}")]
    Parse(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::Rejected(_) => "VALIDATION",
            Self::MalformedFile(_) => "MALFORMED_FILE",
            Self::Parse(_) => "PARSE",
            Self::Io(_) => "IO_FAILURE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Field-level failures carried by this error, empty for non-validation errors.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Validation(error) => std::slice::from_ref(error),
            Self::Rejected(errors) => errors,
            _ => &[],
        }
    }

    pub fn is_corrupt_file(&self) -> bool {
        matches!(self, Self::MalformedFile(_) | Self::Parse(_))
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<tempfile::PersistError> for AppError {
    fn from(value: tempfile::PersistError) -> Self {
        Self::Io(value.error.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        if value.is_io_error() {
            return Self::Io(value.to_string());
        }
        Self::MalformedFile(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_mentions_row_when_known() {
        let error = ValidationError::new(Field::Value, "'x' is not a number");
        assert_eq!(error.to_string(), "Value: 'x' is not a number");
        assert_eq!(error.at_row(3).to_string(), "row 3: Value: 'x' is not a number");
    }
}
