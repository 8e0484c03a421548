/// Validation errors for user input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password too short: minimum 8 characters required")]
    PasswordTooShort,

    #[error("Invalid full name: must be 1-100 characters")]
    InvalidFullname,
}

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_FULLNAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254;

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail);
    }

    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None)
            if !local.is_empty()
                && !domain.is_empty()
                && !email.chars().any(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(ValidationError::InvalidEmail),
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_fullname(fullname: &str) -> Result<(), ValidationError> {
    let trimmed = fullname.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_FULLNAME_LENGTH {
        return Err(ValidationError::InvalidFullname);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(validate_email("a@b.io").is_ok());
        assert!(validate_email(" padded@example.com ").is_ok());
        assert_eq!(validate_email("no-at-sign"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("@example.com"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a@"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a@b@c"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a b@c.d"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn password_length_counts_characters() {
        assert_eq!(validate_password("short"), Err(ValidationError::PasswordTooShort));
        assert!(validate_password("eightchr").is_ok());
        assert!(validate_password("пароль12").is_ok());
    }

    #[test]
    fn fullname_bounds() {
        assert!(validate_fullname("Ada Lovelace").is_ok());
        assert_eq!(validate_fullname(""), Err(ValidationError::InvalidFullname));
        assert_eq!(
            validate_fullname(&"x".repeat(MAX_FULLNAME_LENGTH + 1)),
            Err(ValidationError::InvalidFullname)
        );
    }
}
