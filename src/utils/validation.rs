// Small input-normalization helpers shared by request DTO handling.

/// Trim a required field and reject when empty after trimming
pub fn trim_and_validate_field(value: &str, field_name: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{} is required", field_name))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trim an optional field, mapping whitespace-only input to None
pub fn trim_optional_field(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
