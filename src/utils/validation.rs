use crate::utils::error::{GestorError, Result};
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_NAME_LENGTH: usize = 100;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
    })
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(GestorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(GestorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(GestorError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 名稱欄位：不可為空白，長度上限 100 字元
pub fn validate_name(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GestorError::validation(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(GestorError::validation(
            field_name,
            format!("Value cannot exceed {} characters", MAX_NAME_LENGTH),
        ));
    }
    Ok(())
}

pub fn validate_email(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GestorError::validation(field_name, "Email is required"));
    }
    if !email_pattern().is_match(value.trim()) {
        return Err(GestorError::validation(
            field_name,
            format!("'{}' is not a valid email address", value),
        ));
    }
    Ok(())
}
