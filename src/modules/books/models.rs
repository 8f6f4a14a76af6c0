use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

pub const TITLE_MAX_LEN: usize = 80;
pub const AUTHOR_MAX_LEN: usize = 40;

/// A persisted book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Storage-assigned identifier, never reused
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Set once on insert
    #[serde(with = "time::serde::rfc3339")]
    pub date_added: OffsetDateTime,
}

/// Validated client payload for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
}

impl BookInput {
    /// Decode and validate a JSON payload.
    ///
    /// Every field problem is reported, not just the first one. Unknown keys
    /// are ignored.
    pub fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let Some(object) = value.as_object() else {
            return Err(ValidationErrors(vec![FieldError {
                field: "body",
                error: FieldErrorKind::NotAnObject,
            }]));
        };

        let mut errors = Vec::new();
        let title = required_string(object, "title", TITLE_MAX_LEN, &mut errors);
        let author = required_string(object, "author", AUTHOR_MAX_LEN, &mut errors);

        match (title, author) {
            (Some(title), Some(author)) => Ok(Self { title, author }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

fn required_string(
    object: &Map<String, Value>,
    field: &'static str,
    max_len: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let error = match object.get(field) {
        None | Some(Value::Null) => FieldErrorKind::Required,
        Some(Value::String(s)) if s.is_empty() => FieldErrorKind::Empty,
        Some(Value::String(s)) if s.chars().count() > max_len => {
            FieldErrorKind::TooLong { max: max_len }
        }
        Some(Value::String(s)) => return Some(s.clone()),
        Some(_) => FieldErrorKind::NotAString,
    };

    errors.push(FieldError { field, error });
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    NotAString,
    Empty,
    TooLong { max: usize },
    NotAnObject,
}

impl FieldErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            FieldErrorKind::Required => "required",
            FieldErrorKind::NotAString => "not_a_string",
            FieldErrorKind::Empty => "empty",
            FieldErrorKind::TooLong { .. } => "too_long",
            FieldErrorKind::NotAnObject => "not_an_object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub error: FieldErrorKind,
}

impl FieldError {
    pub fn to_detail(&self) -> Value {
        let mut detail = serde_json::json!({
            "field": self.field,
            "error": self.error.code(),
        });
        if let FieldErrorKind::TooLong { max } = self.error {
            detail["max_length"] = Value::from(max);
        }
        detail
    }
}

/// All field problems found in one payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid book payload: {}", fields(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn details(&self) -> Vec<Value> {
        self.0.iter().map(FieldError::to_detail).collect()
    }
}

fn fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} is {}", e.field, e.error.code()))
        .collect::<Vec<_>>()
        .join(", ")
}
