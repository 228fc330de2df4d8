//! Registration, sign-in, confirmation, and post-content checks.

use validator::Validate;

use crate::error::{ClientError, ClientResult};
use crate::models::Role;

/// Length of the email confirmation code.
pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, Validate)]
pub struct SignUpForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Validate)]
pub struct SignInForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// The confirmation code must be exactly six ASCII digits.
pub fn validate_otp(code: &str) -> ClientResult<()> {
    if code.len() == OTP_LENGTH && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ClientError::Validation(
            "Please enter a valid 6-digit OTP".to_string(),
        ))
    }
}

/// Returns the trimmed content, or a validation error when it is blank.
pub fn validate_post_content(content: &str) -> ClientResult<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Validation(
            "Post content cannot be empty.".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp() {
        assert!(validate_otp("123456").is_ok());
        assert!(validate_otp("12345").is_err());
        assert!(validate_otp("1234567").is_err());
        assert!(validate_otp("12a456").is_err());
        assert!(validate_otp("１２３４５６").is_err());
    }

    #[test]
    fn test_post_content() {
        assert_eq!(validate_post_content("  Hello world \n").unwrap(), "Hello world");
        assert!(matches!(
            validate_post_content(" \t\n"),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn test_sign_up_form() {
        let form = SignUpForm {
            email: "ada@uni.edu".to_string(),
            password: "correct-horse".to_string(),
            name: "Ada".to_string(),
            role: Role::Researcher,
        };
        assert!(form.validate().is_ok());

        let bad = SignUpForm {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            ..form
        };
        let err = ClientError::from(bad.validate().unwrap_err());
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_sign_in_form() {
        let form = SignInForm {
            email: "ada@uni.edu".to_string(),
            password: String::new(),
        };
        assert!(form.validate().is_err());
    }
}
