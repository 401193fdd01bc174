//! Validation of raw check records.
//!
//! Records come straight from storage as untyped JSON, so every field the
//! engine relies on is checked here before a probe is ever attempted. The
//! same rules back the check-creation path, which keeps a freshly created
//! check from being rejected by the engine later on.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::check::parse_target;
use crate::models::{CHECK_ID_LEN, CheckRecord, CheckState, HttpMethod, Protocol};

/// Minimum length of an owner phone identifier.
pub const MIN_PHONE_LEN: usize = 10;

/// Lower bound of `timeoutSeconds`.
pub const MIN_TIMEOUT_SECONDS: u64 = 1;

/// Default upper bound of `timeoutSeconds`.
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    Missing(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Invalid { field, reason: reason.into() }
    }

    /// Name of the offending field, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::NotAnObject => None,
            ValidationError::Missing(field) | ValidationError::Invalid { field, .. } => {
                Some(*field)
            }
        }
    }
}

/// Turns raw check documents into [`CheckRecord`]s
#[derive(Debug, Clone, Copy)]
pub struct CheckValidator {
    max_timeout_seconds: u64,
}

impl Default for CheckValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TIMEOUT_SECONDS)
    }
}

impl CheckValidator {
    pub fn new(max_timeout_seconds: u64) -> Self {
        Self { max_timeout_seconds: max_timeout_seconds.max(MIN_TIMEOUT_SECONDS) }
    }

    pub fn max_timeout_seconds(&self) -> u64 {
        self.max_timeout_seconds
    }

    /// Validate a stored record before probing it.
    ///
    /// Engine-owned fields are lenient: an unknown `state` falls back to
    /// `down` and a malformed `lastChecked` is treated as never checked.
    pub fn validate(&self, raw: &Value) -> Result<CheckRecord, ValidationError> {
        let fields = raw.as_object().ok_or(ValidationError::NotAnObject)?;

        let id = required_str(fields, "id")?;
        if id.chars().count() != CHECK_ID_LEN {
            return Err(ValidationError::invalid(
                "id",
                format!("must be {CHECK_ID_LEN} characters long"),
            ));
        }

        let owner_phone = required_str(fields, "userPhone")?;
        if owner_phone.chars().count() < MIN_PHONE_LEN {
            return Err(ValidationError::invalid(
                "userPhone",
                format!("must be at least {MIN_PHONE_LEN} characters long"),
            ));
        }

        let protocol: Protocol = required_str(fields, "protocol")?
            .parse()
            .map_err(|reason: String| ValidationError::invalid("protocol", reason))?;

        let url = required_str(fields, "url")?;
        parse_target(protocol, url)
            .map_err(|e| ValidationError::invalid("url", format!("not a reachable target: {e}")))?;

        let http_method: HttpMethod = required_str(fields, "method")?
            .parse()
            .map_err(|reason: String| ValidationError::invalid("method", reason))?;

        let success_codes = success_codes(fields)?;
        let timeout_seconds = self.timeout_seconds(fields)?;

        Ok(CheckRecord {
            id: id.to_string(),
            owner_phone: owner_phone.to_string(),
            protocol,
            url: url.to_string(),
            http_method,
            success_codes,
            timeout_seconds,
            state: engine_state(fields),
            last_checked_at: last_checked_at(fields),
        })
    }

    /// Validate the user-supplied part of a check that is about to be
    /// created. Engine-owned fields are reset.
    pub fn validate_new(&self, raw: &Value) -> Result<CheckRecord, ValidationError> {
        let mut check = self.validate(raw)?;
        check.state = CheckState::default();
        check.last_checked_at = None;
        Ok(check)
    }

    fn timeout_seconds(&self, fields: &Map<String, Value>) -> Result<u64, ValidationError> {
        let timeout = required(fields, "timeoutSeconds")?
            .as_u64()
            .ok_or_else(|| ValidationError::invalid("timeoutSeconds", "must be a whole number"))?;

        if !(MIN_TIMEOUT_SECONDS..=self.max_timeout_seconds).contains(&timeout) {
            return Err(ValidationError::invalid(
                "timeoutSeconds",
                format!(
                    "must be between {MIN_TIMEOUT_SECONDS} and {} seconds, got {timeout}",
                    self.max_timeout_seconds
                ),
            ));
        }
        Ok(timeout)
    }
}

/// A `null` counts as absent.
fn required<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a Value, ValidationError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(ValidationError::Missing(name)),
        Some(value) => Ok(value),
    }
}

/// Trimmed, non-empty string field.
fn required_str<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, ValidationError> {
    let value = required(fields, name)?
        .as_str()
        .ok_or_else(|| ValidationError::invalid(name, "must be a string"))?
        .trim();

    if value.is_empty() {
        return Err(ValidationError::invalid(name, "must not be empty"));
    }
    Ok(value)
}

fn success_codes(fields: &Map<String, Value>) -> Result<Vec<u16>, ValidationError> {
    let codes = required(fields, "successCodes")?
        .as_array()
        .ok_or_else(|| ValidationError::invalid("successCodes", "must be an array"))?;

    if codes.is_empty() {
        return Err(ValidationError::invalid("successCodes", "must not be empty"));
    }

    codes
        .iter()
        .map(|code| {
            code.as_u64()
                .filter(|c| (100..=599).contains(c))
                .map(|c| c as u16)
                .ok_or_else(|| {
                    ValidationError::invalid(
                        "successCodes",
                        format!("{code} is not an HTTP status code"),
                    )
                })
        })
        .collect()
}

fn engine_state(fields: &Map<String, Value>) -> CheckState {
    fields
        .get("state")
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_default()
}

fn last_checked_at(fields: &Map<String, Value>) -> Option<i64> {
    let value = fields.get("lastChecked")?;
    if let Some(ms) = value.as_i64() {
        return (ms >= 0).then_some(ms);
    }
    value.as_f64().filter(|ms| ms.is_finite() && *ms >= 0.0).map(|ms| ms as i64)
}
