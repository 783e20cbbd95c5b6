//! Input validation run at the inbound boundary, before anything is persisted.

use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_GENRE_LENGTH: usize = 50;
pub const MAX_AUTHOR_LENGTH: usize = 100;

/// Malformed caller input, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::new("username", "Username cannot be empty"));
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::new(
            "username",
            format!("Username must be {MAX_USERNAME_LENGTH} characters or less"),
        ));
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() {
        return Err(ValidationError::new("password", "Password cannot be empty"));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }

    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::new("title", "Product title cannot be empty"));
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::new(
            "title",
            format!("Product title must be {MAX_TITLE_LENGTH} characters or less"),
        ));
    }

    Ok(())
}

pub fn validate_price(price: f64) -> Result<(), ValidationError> {
    // NaN fails every comparison, so check finiteness explicitly.
    if !price.is_finite() || price <= 0.0 {
        return Err(ValidationError::new(
            "price",
            "Product price must be a positive number",
        ));
    }

    Ok(())
}

pub fn validate_optional_len(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    if let Some(value) = value
        && value.chars().count() > max
    {
        return Err(ValidationError::new(
            field,
            format!("Must be {max} characters or less"),
        ));
    }

    Ok(())
}

/// Only the declared content type is inspected, never the file extension.
pub fn validate_image_content_type(content_type: Option<&str>) -> Result<(), ValidationError> {
    match content_type {
        Some(ct) if ct.starts_with("image/") => Ok(()),
        _ => Err(ValidationError::new(
            "content_type",
            "Only image uploads are allowed",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("пароль12").is_ok());
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("        ").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Dune").is_ok());
        assert!(validate_title(&"t".repeat(100)).is_ok());
        assert!(validate_title(&"t".repeat(101)).is_err());
        assert!(validate_title(" \t").is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(0.01).is_ok());
        assert!(validate_price(1500.0).is_ok());
        for bad in [0.0, -0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = validate_price(bad).unwrap_err();
            assert_eq!(err.field, "price");
        }
    }

    #[test]
    fn test_validate_image_content_type() {
        assert!(validate_image_content_type(Some("image/png")).is_ok());
        assert!(validate_image_content_type(Some("image/jpeg")).is_ok());
        assert!(validate_image_content_type(Some("text/plain")).is_err());
        assert!(validate_image_content_type(Some("IMAGE/PNG")).is_err());
        assert!(validate_image_content_type(None).is_err());
    }

    #[test]
    fn test_validate_optional_len() {
        assert!(validate_optional_len("genre", None, 5).is_ok());
        assert!(validate_optional_len("genre", Some("drama"), 5).is_ok());
        assert!(validate_optional_len("genre", Some("comedy"), 5).is_err());
    }
}
