//! Shared field validators used by the request payload types.

use chrono::NaiveDate;
use validator::{ValidationError, ValidationErrors};

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Loose international phone shape: optional leading `+`, then 10-15
/// digits/spaces/dashes/parentheses.
pub fn phone(value: &str) -> Result<(), ValidationError> {
    let rest = value.strip_prefix('+').unwrap_or(value);
    let valid_chars = rest
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    if !valid_chars || !(10..=15).contains(&rest.len()) {
        return Err(error("phone", "Invalid phone number format"));
    }
    Ok(())
}

pub fn not_in_future(value: &NaiveDate) -> Result<(), ValidationError> {
    if *value > chrono::Utc::now().date_naive() {
        return Err(error(
            "date_of_birth",
            "Date of birth cannot be in the future",
        ));
    }
    Ok(())
}

/// License numbers are 6-20 characters, uppercase letters and digits only.
pub fn license_number(value: &str) -> Result<(), ValidationError> {
    let valid = (6..=20).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if !valid {
        return Err(error(
            "license_number",
            "License number should be 6-20 characters, letters and numbers only",
        ));
    }
    Ok(())
}

/// Flatten `validator` output into the envelope's `errors` array.
pub fn collect_errors(errors: &ValidationErrors) -> Vec<String> {
    let mut messages = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for err in field_errors {
            match &err.message {
                Some(message) => messages.push(message.to_string()),
                None => messages.push(format!("{field} is invalid")),
            }
        }
    }
    messages.sort();
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_accepts_common_shapes() {
        assert!(phone("+1 (555) 123-4567").is_ok());
        assert!(phone("5551234567").is_ok());
    }

    #[test]
    fn phone_rejects_letters_and_short_numbers() {
        assert!(phone("call-me").is_err());
        assert!(phone("12345").is_err());
    }

    #[test]
    fn birth_date_must_not_be_in_future() {
        let past = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert!(not_in_future(&past).is_ok());
        let future = chrono::Utc::now().date_naive() + chrono::Days::new(2);
        assert!(not_in_future(&future).is_err());
    }

    #[test]
    fn license_number_shape() {
        assert!(license_number("MD12345").is_ok());
        assert!(license_number("md12345").is_err());
        assert!(license_number("A1").is_err());
    }
}
