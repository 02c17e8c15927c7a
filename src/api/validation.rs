//! Field checks for submitted forms. Each check records its message in
//! [`FormErrors`] under the field name.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use super::FormErrors;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").ok());

pub const REQUIRED: &str = "This field is required.";

/// Value with surrounding whitespace removed, `None` when blank.
#[must_use]
pub fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub fn required(errors: &mut FormErrors, field: &'static str, value: &str) -> bool {
    if non_empty(value).is_none() {
        errors.add(field, REQUIRED);
        return false;
    }
    true
}

#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE
        .as_ref()
        .is_some_and(|re| re.is_match(value.trim()))
}

pub fn email(errors: &mut FormErrors, field: &'static str, value: &str) {
    if non_empty(value).is_some() && !is_valid_email(value) {
        errors.add(field, "Invalid email address.");
    }
}

pub fn max_length(errors: &mut FormErrors, field: &'static str, value: &str, max: usize) {
    if value.trim().chars().count() > max {
        errors.add(field, format!("Field cannot be longer than {max} characters."));
    }
}

/// Blank values are accepted; use [`required`] as well when they are not.
pub fn one_of(errors: &mut FormErrors, field: &'static str, value: &str, choices: &[&str]) {
    if let Some(value) = non_empty(value)
        && !choices.contains(&value)
    {
        errors.add(field, "Not a valid choice.");
    }
}

/// Parses a non-negative integer. Blank yields `None` without an error.
pub fn integer(errors: &mut FormErrors, field: &'static str, value: &str) -> Option<i32> {
    let value = non_empty(value)?;
    match value.parse::<i32>() {
        Ok(n) if n >= 0 => Some(n),
        _ => {
            errors.add(field, "Not a valid integer value.");
            None
        }
    }
}

/// Parses `YYYY-MM-DD`. Blank yields `None` without an error.
pub fn date(errors: &mut FormErrors, field: &'static str, value: &str) -> Option<NaiveDate> {
    let value = non_empty(value)?;
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Some(date)
    } else {
        errors.add(field, "Not a valid date value.");
        None
    }
}
