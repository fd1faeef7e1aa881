//! Input validation for account fields.

use once_cell::sync::Lazy;
use regex::Regex;

// Compiled once on first use.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

pub const MAX_NAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if !EMAIL_REGEX.is_match(email) || email.len() > 255 {
        return Err("Please provide a valid email".to_string());
    }
    Ok(())
}

/// At least 8 characters with an uppercase letter, a lowercase letter and a digit.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters".to_string());
    }

    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lowercase && has_uppercase && has_digit) {
        return Err(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                .to_string(),
        );
    }
    Ok(())
}

/// `label` is the human name of the field, e.g. "First name".
pub fn validate_name(label: &str, value: &str) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{label} is required"));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("{label} cannot exceed {MAX_NAME_LENGTH} characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("  user.name+tag@domain.co.uk ").is_ok());
        assert!(validate_email("invalid-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("test@").is_err());
        assert!(validate_email(&format!("{}@example.com", "a".repeat(250))).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Password123").is_ok());
        assert!(validate_password("Pass1").is_err());
        assert!(validate_password("password123").is_err());
        assert!(validate_password("PASSWORD123").is_err());
        assert!(validate_password("Passwordabc").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("First name", "Ada").is_ok());
        assert_eq!(
            validate_name("First name", "   ").unwrap_err(),
            "First name is required"
        );
        assert!(validate_name("Last name", &"x".repeat(51)).is_err());
        assert!(validate_name("Last name", &"x".repeat(50)).is_ok());
    }
}
