//! Homework review payloads
//!
//! The status API is treated defensively: the body stays a raw JSON value
//! and every shape deviation becomes a `NotifierError` instead of a panic.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{error, info};

use crate::error::{NotifierError, Result};

/// Review status of a homework submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeworkStatus {
    Approved,
    Reviewing,
    Rejected,
}

impl HomeworkStatus {
    pub const ALL: [HomeworkStatus; 3] = [Self::Approved, Self::Reviewing, Self::Rejected];

    /// Status code as sent by the API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
        }
    }

    /// Human-readable verdict shown to the user
    pub fn verdict(&self) -> &'static str {
        match self {
            Self::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            Self::Reviewing => "Работа взята на проверку ревьюером.",
            Self::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HomeworkStatus {
    type Err = NotifierError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| NotifierError::UnknownStatus(raw.to_string()))
    }
}

/// Extract the homework list from a status response.
pub fn check_response(response: &Value) -> Result<&[Value]> {
    let Some(body) = response.as_object() else {
        return Err(shape_error("Ответ API не является словарём"));
    };

    let Some(homeworks) = body.get("homeworks") else {
        return Err(shape_error("Ошибка доступа по ключу homeworks"));
    };

    let Some(homeworks) = homeworks.as_array() else {
        return Err(shape_error("В ответе API домашки представлены не списком"));
    };

    if homeworks.is_empty() {
        return Err(shape_error("За последнее время не было домашней работы"));
    }

    Ok(homeworks.as_slice())
}

fn shape_error(msg: &str) -> NotifierError {
    error!("{}", msg);
    NotifierError::CheckResponse(msg.to_string())
}

/// Build the notification text for a single homework record.
pub fn parse_status(homework: &Value) -> Result<String> {
    let name = required_str(homework, "homework_name")?;
    let raw_status = required_str(homework, "status")?;

    let status = raw_status.parse::<HomeworkStatus>().map_err(|e| {
        error!("Unknown homework status '{}' for '{}'", raw_status, name);
        e
    })?;

    info!("Homework '{}' has status {}", name, status);
    Ok(format!(
        "Изменился статус проверки работы \"{}\". {}",
        name,
        status.verdict()
    ))
}

fn required_str<'a>(record: &'a Value, field: &'static str) -> Result<&'a str> {
    match record.get(field).and_then(Value::as_str) {
        Some(value) => Ok(value),
        None => {
            error!("Homework record has no '{}' field", field);
            Err(NotifierError::MissingField(field))
        }
    }
}

/// Only the first record is inspected; the API lists the most recent first.
pub fn latest_message(response: &Value) -> Result<String> {
    let homeworks = check_response(response)?;
    parse_status(&homeworks[0])
}

/// Server-side timestamp to use as the next `from_date`.
pub fn next_cursor(response: &Value) -> Option<i64> {
    response.get("current_date").and_then(Value::as_i64)
}
