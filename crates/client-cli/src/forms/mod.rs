//! Editable form state and the typed payloads built from it.

pub mod contact;
pub mod lesson;
pub mod reservation;
pub mod room;
pub mod study;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::api::ApiError;
use crate::dashboard::describe_failure;

pub use self::contact::ContactForm;
pub use self::lesson::LessonForm;
pub use self::reservation::ReservationForm;
pub use self::room::RoomForm;
pub use self::study::StudyForm;

pub const REQUIRED_FIELDS: &str = "Please fill in all required fields";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{}", REQUIRED_FIELDS)]
    Missing(&'static str),
    #[error("{0} must be a whole number")]
    NotANumber(&'static str),
    #[error("{0} must be a date (YYYY-MM-DD)")]
    BadDate(&'static str),
    #[error("{0} must be a time (HH:MM)")]
    BadTime(&'static str),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SubmitError {
    /// Text for the form's error line. `rejected` is used when the service
    /// turned the payload down.
    pub fn message(&self, rejected: &str) -> String {
        match self {
            SubmitError::Invalid(e) => e.to_string(),
            SubmitError::Api(e) => describe_failure(e, rejected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Multiline,
    Number,
    Date,
    Time,
    Toggle,
    /// One of [`EditableForm::choices`]
    Choice,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl Field {
    pub const fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            required: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Uniform access to a form's controlled fields, used by the terminal editor.
pub trait EditableForm {
    fn title(&self) -> String;
    fn fields(&self) -> &'static [Field];
    fn value(&self, key: &str) -> String;
    fn set_value(&mut self, key: &str, value: String);
    fn error(&self) -> Option<&str>;

    /// `(value, label)` options for a [`FieldKind::Choice`] field.
    fn choices(&self, _key: &str) -> Vec<(String, String)> {
        Vec::new()
    }
}

pub(crate) fn required(value: &str, field: &'static str) -> Result<String, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FormError::Missing(field));
    }
    Ok(value.to_string())
}

/// Blank input is left out of the payload.
pub(crate) fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub(crate) fn parse_number(value: &str, field: &'static str) -> Result<i64, FormError> {
    value.trim().parse().map_err(|_| FormError::NotANumber(field))
}

pub(crate) fn optional_number(value: &str, field: &'static str) -> Result<Option<i64>, FormError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_number(value, field).map(Some)
}

pub(crate) fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, FormError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| FormError::BadDate(field))
}

pub(crate) fn parse_time(value: &str, field: &'static str) -> Result<NaiveTime, FormError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| FormError::BadTime(field))
}

pub(crate) fn flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "yes" | "y" | "1" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_parsers() {
        assert_eq!(required("  Hall ", "Name"), Ok("Hall".to_string()));
        assert_eq!(required(" ", "Name"), Err(FormError::Missing("Name")));
        assert_eq!(optional(""), None);
        assert_eq!(parse_number("30", "Capacity"), Ok(30));
        assert_eq!(parse_number("thirty", "Capacity"), Err(FormError::NotANumber("Capacity")));
        assert_eq!(optional_number("", "Duration"), Ok(None));
        assert!(parse_date("2024-06-01", "Date").is_ok());
        assert_eq!(parse_date("06/01/2024", "Date"), Err(FormError::BadDate("Date")));
        assert!(parse_time("09:30", "Start").is_ok());
        assert!(parse_time("09:30:00", "Start").is_ok());
        assert!(flag("true") && !flag("false"));
    }

    #[test]
    fn test_submit_error_messages() {
        let invalid = SubmitError::from(FormError::Missing("Title"));
        assert_eq!(invalid.message("conflict"), REQUIRED_FIELDS);

        let rejected = SubmitError::from(ApiError::Rejected {
            status: 409,
            message: "overlap".to_string(),
        });
        assert_eq!(rejected.message("conflict"), "conflict");
    }
}
