use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Shortest password accepted at registration and on profile updates.
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Maximum length of titles, names, usernames and links.
pub const MAX_NAME_LENGTH: usize = 255;

/// Prices are stored as NUMERIC(5, 2).
const PRICE_MAX_DIGITS: u32 = 5;
const PRICE_DECIMAL_PLACES: u32 = 2;

/// Normalize an email address by lowercasing its domain part.
///
/// The local part is case-sensitive per RFC 5321 and is kept as-is, so
/// `Test2@Example.com` becomes `Test2@example.com`.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "This field may not be blank."));
    }
    Ok(())
}

pub fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(invalid(
            "min_value",
            "Ensure this value is greater than or equal to 0.",
        ));
    }
    if price.normalize().scale() > PRICE_DECIMAL_PLACES {
        return Err(invalid(
            "max_decimal_places",
            "Ensure that there are no more than 2 decimal places.",
        ));
    }
    let limit = Decimal::from(10_i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if price.abs() >= limit {
        return Err(invalid(
            "max_digits",
            "Ensure that there are no more than 5 digits in total.",
        ));
    }
    Ok(())
}

/// Links are optional: an empty string is accepted, anything else must be
/// an absolute http(s) URL.
pub fn validate_link(link: &str) -> Result<(), ValidationError> {
    if link.is_empty() {
        return Ok(());
    }
    if link.chars().count() > MAX_NAME_LENGTH {
        return Err(invalid(
            "length",
            "Ensure this field has no more than 255 characters.",
        ));
    }
    match url::Url::parse(link) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(invalid("url", "Enter a valid URL.")),
    }
}

fn message_for(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    match err.code.as_ref() {
        "email" => "Enter a valid email address.".to_string(),
        "length" => "Ensure this field has a valid length.".to_string(),
        "required" => "This field is required.".to_string(),
        code => format!("Invalid value ({})", code),
    }
}

/// Flatten validator errors into `{"field": ["message", ...]}`.
///
/// Nested structs become nested objects and list items are keyed by their
/// index, e.g. `{"tags": {"1": {"name": ["..."]}}}`.
pub fn error_fields(errors: &ValidationErrors) -> Value {
    let mut fields = Map::new();
    for (field, kind) in errors.errors() {
        let value = match kind {
            ValidationErrorsKind::Field(errs) => {
                Value::Array(errs.iter().map(|e| Value::String(message_for(e))).collect())
            }
            ValidationErrorsKind::Struct(inner) => error_fields(inner),
            ValidationErrorsKind::List(items) => {
                let mut by_index = Map::new();
                for (index, inner) in items {
                    by_index.insert(index.to_string(), error_fields(inner));
                }
                Value::Object(by_index)
            }
        };
        fields.insert(field.to_string(), value);
    }
    Value::Object(fields)
}
