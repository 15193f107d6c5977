//! Input checks applied by the login form before anything is sent to the backend,
//! plus the password strength meter shown next to the password field.

use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("Invalid digit regex"));

static LOWERCASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]").expect("Invalid lowercase regex"));

static UPPERCASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]").expect("Invalid uppercase regex"));

static SPECIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).expect("Invalid special character regex")
});

const MIN_PASSWORD_LENGTH: usize = 8;

/// Validates an email address
///
/// Only the shape the login form cares about is checked: the address must be
/// present and contain an `@`. Whether the account exists is the backend's call.
///
/// # Examples
///
/// ```rust
/// use syncchurch_core::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if !email.contains('@') {
        return Err(ValidationError::InvalidEmail(format!(
            "Please enter a valid email: {email}"
        )));
    }

    Ok(())
}

/// Validates a password before it is submitted
///
/// # Password Requirements
///
/// - At least 8 characters
/// - At least one lowercase letter, one uppercase letter and one digit
///
/// # Examples
///
/// ```rust
/// use syncchurch_core::validation::validate_password;
///
/// assert!(validate_password("Secure123").is_ok());
/// assert!(validate_password("weak").is_err());
/// ```
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField(
            "Password is required".to_string(),
        ));
    }

    let long_enough = password.chars().count() >= MIN_PASSWORD_LENGTH;
    if !long_enough
        || !LOWERCASE.is_match(password)
        || !UPPERCASE.is_match(password)
        || !DIGIT.is_match(password)
    {
        return Err(ValidationError::InvalidPassword(
            "Password must have at least 8 characters, including uppercase, lowercase and numbers"
                .to_string(),
        ));
    }

    Ok(())
}

/// Coarse strength bucket for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StrengthLevel {
    Weak,
    Fair,
    Good,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordStrength {
    /// 0 to 100 in steps of 20.
    pub score: u8,
    pub level: StrengthLevel,
}

/// Scores a password for the strength meter
///
/// Each of the following adds 20 points: length of at least 8, a digit, a lowercase
/// letter, an uppercase letter, a special character.
pub fn password_strength(password: &str) -> PasswordStrength {
    let checks = [
        password.chars().count() >= MIN_PASSWORD_LENGTH,
        DIGIT.is_match(password),
        LOWERCASE.is_match(password),
        UPPERCASE.is_match(password),
        SPECIAL.is_match(password),
    ];
    let score = checks.iter().filter(|passed| **passed).count() as u8 * 20;

    let level = match score {
        0..40 => StrengthLevel::Weak,
        40..60 => StrengthLevel::Fair,
        60..80 => StrengthLevel::Good,
        _ => StrengthLevel::Strong,
    };

    PasswordStrength { score, level }
}
