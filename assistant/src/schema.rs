//! Syntactic validation of exam candidates produced by the model.
//!
//! Every rule is a hard reject. No calendar checks are made (`2025-02-30`
//! passes) and `startTime < endTime` is not enforced.

use exam_planner_core::{is_exam_field, Category, ExamRecord, ExamType, EXAM_FIELDS};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must be text")]
    NotText(&'static str),
    #[error("examType must be one of Mid Term, End Term, CA, Lab, Other (got {0:?})")]
    UnknownExamType(String),
    #[error("category must be Regular or Backlog (got {0:?})")]
    UnknownCategory(String),
    #[error("semester must be a positive integer")]
    InvalidSemester,
    #[error("date must be YYYY-MM-DD")]
    InvalidDate,
    #[error("{0} must be HH:mm")]
    InvalidTime(&'static str),
}

/// Top-level `status` declared by a model payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStatus {
    OffTopic,
    Incomplete,
    Complete,
}

impl PayloadStatus {
    /// Reads the `status` field. Anything but the three known literals is `None`.
    pub fn of(payload: &Map<String, Value>) -> Option<Self> {
        match payload.get("status").and_then(Value::as_str)? {
            "off_topic" => Some(Self::OffTopic),
            "incomplete" => Some(Self::Incomplete),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").unwrap());

fn canonical_name(field: &str) -> Option<&'static str> {
    EXAM_FIELDS.iter().copied().find(|f| *f == field)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn text<'a>(field: &'static str, value: &'a Value) -> Result<&'a str, FieldError> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s),
        Value::String(_) | Value::Null => Err(FieldError::Missing(field)),
        _ => Err(FieldError::NotText(field)),
    }
}

/// Coerces a semester value to a positive integer.
///
/// Accepts JSON numbers with no fractional part and numeric strings such as
/// `"2"` or `" 3 "`; rejects zero, negatives, fractions and anything else.
pub fn coerce_semester(value: &Value) -> Result<u32, FieldError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or(FieldError::InvalidSemester)?;

    if !number.is_finite() || number.fract() != 0.0 || number < 1.0 || number > u32::MAX as f64
    {
        return Err(FieldError::InvalidSemester);
    }
    Ok(number as u32)
}

/// Validates a single field and returns its normalized value.
///
/// Used both for whole candidates and for partial data gathered mid-conversation.
pub fn validate_field(field: &str, value: &Value) -> Result<Value, FieldError> {
    let name = canonical_name(field).ok_or_else(|| FieldError::UnknownField(field.to_string()))?;
    match name {
        "code" | "subject" => text(name, value).map(|s| Value::String(s.to_string())),
        "examType" => {
            let raw = text(name, value)?;
            raw.parse::<ExamType>()
                .map(|t| Value::String(t.as_str().to_string()))
                .map_err(|_| FieldError::UnknownExamType(raw.to_string()))
        }
        "category" => {
            let raw = text(name, value)?;
            raw.parse::<Category>()
                .map(|c| Value::String(c.as_str().to_string()))
                .map_err(|_| FieldError::UnknownCategory(raw.to_string()))
        }
        "semester" => coerce_semester(value).map(Value::from),
        "date" => {
            let raw = text(name, value)?;
            if DATE_PATTERN.is_match(raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(FieldError::InvalidDate)
            }
        }
        _ => {
            let raw = text(name, value)?;
            if TIME_PATTERN.is_match(raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(FieldError::InvalidTime(name))
            }
        }
    }
}

/// Checks every field of a candidate, in canonical order, stopping at the first failure.
pub fn check_candidate(candidate: &Map<String, Value>) -> Result<ExamRecord, FieldError> {
    for field in EXAM_FIELDS {
        if candidate.get(field).map_or(true, is_blank) {
            return Err(FieldError::Missing(field));
        }
    }

    let text_of = |field: &'static str| -> Result<String, FieldError> {
        validate_field(field, &candidate[field])?;
        text(field, &candidate[field]).map(str::to_string)
    };

    let code = text_of("code")?;
    let subject = text_of("subject")?;
    let raw_type = text("examType", &candidate["examType"])?;
    let exam_type = raw_type
        .parse::<ExamType>()
        .map_err(|_| FieldError::UnknownExamType(raw_type.to_string()))?;
    let raw_category = text("category", &candidate["category"])?;
    let category = raw_category
        .parse::<Category>()
        .map_err(|_| FieldError::UnknownCategory(raw_category.to_string()))?;
    let semester = coerce_semester(&candidate["semester"])?;
    let date = text_of("date")?;
    let start_time = text_of("startTime")?;
    let end_time = text_of("endTime")?;

    Ok(ExamRecord {
        code,
        subject,
        exam_type,
        category,
        semester,
        date,
        start_time,
        end_time,
    })
}

/// Validates a candidate exam object, returning the normalized record or `None`.
///
/// `semester` is coerced to a number; every other field passes through unchanged.
pub fn validate_candidate(candidate: &Value) -> Option<ExamRecord> {
    check_candidate(candidate.as_object()?).ok()
}

/// Field names of `candidate` that are absent or fail validation, in canonical order.
pub fn invalid_fields(candidate: &Map<String, Value>) -> Vec<String> {
    EXAM_FIELDS
        .iter()
        .filter(|f| match candidate.get(**f) {
            Some(v) if !is_blank(v) => validate_field(f, v).is_err(),
            _ => true,
        })
        .map(|f| f.to_string())
        .collect()
}

/// Keeps only the known fields of `candidate` that validate, normalized.
pub fn valid_subset(candidate: &Map<String, Value>) -> Map<String, Value> {
    candidate
        .iter()
        .filter(|(k, _)| is_exam_field(k))
        .filter_map(|(k, v)| validate_field(k, v).ok().map(|v| (k.clone(), v)))
        .collect()
}
