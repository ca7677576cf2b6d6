//! Field rules shared by signup, profile and the admin forms.

use serde::Deserialize;

use crate::error::{AppError, AppResult};

pub const PHONE_DIGITS: usize = 10;
pub const MIN_PASSWORD_LEN: usize = 4;

pub fn is_valid_phone(raw: &str) -> bool {
    raw.len() == PHONE_DIGITS && raw.bytes().all(|b| b.is_ascii_digit())
}

pub fn validate_phone(raw: &str) -> AppResult<()> {
    if is_valid_phone(raw) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Phone number must be exactly 10 digits".to_string(),
        ))
    }
}

pub fn validate_password(raw: &str) -> AppResult<()> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Trims a required text field, rejecting missing or blank values.
pub fn required(field: &str, value: Option<&str>) -> AppResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::BadRequest(format!("{field} is required"))),
    }
}

pub fn max_len(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Integer form field that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IntInput {
    Number(i64),
    Text(String),
}

impl IntInput {
    /// The parsed value, or `None` for text that is not an integer.
    pub fn value(&self) -> Option<i64> {
        match self {
            IntInput::Number(n) => Some(*n),
            IntInput::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, IntInput::Text(s) if s.trim().is_empty())
    }

    /// Parses the value and checks it lies within `min..=max`.
    pub fn bounded(&self, field: &str, min: i32, max: i32) -> AppResult<i32> {
        self.value()
            .filter(|v| (i64::from(min)..=i64::from(max)).contains(v))
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| {
                let kind = if min > 0 { "a positive" } else { "a non-negative" };
                AppError::BadRequest(format!(
                    "{field} must be {kind} integer no greater than {max}"
                ))
            })
    }
}

/// Case-insensitive substring match of `keyword` against any of `fields`.
/// A blank keyword matches everything.
pub fn matches_keyword<'a, I>(keyword: &str, fields: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = keyword.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    fields
        .into_iter()
        .any(|field| field.to_lowercase().contains(&needle))
}
