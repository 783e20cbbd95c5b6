use super::ApiError;

pub fn validate_id(resource: &str, id: i64) -> Result<i64, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {resource} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

/// Parses a form price field. Blank input is reported as missing rather than
/// as a parse failure.
pub fn parse_price(raw: &str) -> Result<f64, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Price is required"));
    }

    trimmed
        .parse::<f64>()
        .map_err(|_| ApiError::validation(format!("Invalid price: {trimmed}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("product", 1).is_ok());
        assert!(validate_id("product", 0).is_err());
        assert!(validate_id("image", -5).is_err());
    }

    #[test]
    fn test_parse_price() {
        assert!((parse_price(" 12.50 ").unwrap() - 12.5).abs() < f64::EPSILON);
        assert!(parse_price("").is_err());
        assert!(parse_price("twelve").is_err());
        // Range checks belong to the catalog, not the parser.
        assert!(parse_price("-3").is_ok());
    }
}
