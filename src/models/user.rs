use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::avatar::gravatar_url;
use crate::schema::users;

use super::{ModelValidationError, ValidationResult};

pub const USERNAME_MAX_CHARS: usize = 150;

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn avatar_url(&self) -> String {
        gravatar_url(&self.email)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn validate(&mut self) -> ValidationResult<()> {
        self.username = self.username.trim().to_string();
        ensure_valid_username(&self.username)?;

        self.email = self.email.trim().to_lowercase();
        ensure_valid_email(&self.email)?;

        ensure_hash_present(&self.password_hash)?;
        Ok(())
    }
}

/// Usernames follow the conventional web-account rules: letters, digits and
/// `@ . + - _`, so e-mail shaped names are valid.
pub(crate) fn ensure_valid_username(value: &str) -> ValidationResult<()> {
    let len = value.chars().count();
    if !(1..=USERNAME_MAX_CHARS).contains(&len) || !value.is_ascii() {
        tracing::debug!(
            length = len,
            is_ascii = value.is_ascii(),
            "Username validation failed: invalid length or non-ASCII characters"
        );
        return Err(ModelValidationError::InvalidUsername);
    }

    let allowed = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !allowed {
        tracing::debug!("Username validation failed: contains invalid characters");
        return Err(ModelValidationError::InvalidUsername);
    }
    Ok(())
}

pub(crate) fn ensure_valid_email(value: &str) -> ValidationResult<()> {
    let len = value.len();
    if !(3..=255).contains(&len) {
        tracing::debug!(length = len, "Email validation failed: invalid length");
        return Err(ModelValidationError::InvalidEmail);
    }

    let Some((local, domain)) = value.split_once('@') else {
        tracing::debug!("Email validation failed: missing @");
        return Err(ModelValidationError::InvalidEmail);
    };
    if domain.contains('@') {
        tracing::debug!("Email validation failed: multiple @ symbols");
        return Err(ModelValidationError::InvalidEmail);
    }

    if local.is_empty() || domain.len() < 3 || !domain.contains('.') {
        tracing::debug!(
            local_empty = local.is_empty(),
            domain_length = domain.len(),
            has_dot = domain.contains('.'),
            "Email validation failed: invalid local or domain part"
        );
        return Err(ModelValidationError::InvalidEmail);
    }

    if !value.chars().all(|c| c.is_ascii_graphic()) {
        tracing::debug!("Email validation failed: contains invalid characters");
        return Err(ModelValidationError::InvalidEmail);
    }

    Ok(())
}

pub(crate) fn ensure_valid_password(password: &str) -> ValidationResult<()> {
    if password.len() < 12 {
        tracing::debug!(
            length = password.len(),
            "Password validation failed: too short (minimum 12 characters)"
        );
        return Err(ModelValidationError::WeakPassword);
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if has_upper && has_lower && has_digit && has_symbol {
        Ok(())
    } else {
        tracing::debug!(
            has_uppercase = has_upper,
            has_lowercase = has_lower,
            has_digit = has_digit,
            has_symbol = has_symbol,
            "Password validation failed: missing required character types"
        );
        Err(ModelValidationError::WeakPassword)
    }
}

fn ensure_hash_present(password_hash: &str) -> ValidationResult<()> {
    if password_hash.is_empty() {
        tracing::error!("Password hash is empty during validation");
        Err(ModelValidationError::WeakPassword)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usernames_with_punctuation_are_valid() {
        for name in ["testuser", "test-user", "testuser@foo.com", "a.b+c_d", "x"] {
            assert!(ensure_valid_username(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_usernames_rejected() {
        let too_long = "a".repeat(USERNAME_MAX_CHARS + 1);
        for name in ["", "has space", "slash/name", "ünïcode", too_long.as_str()] {
            assert_eq!(
                ensure_valid_username(name),
                Err(ModelValidationError::InvalidUsername),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(ensure_valid_email("user@foo.com").is_ok());
        assert!(ensure_valid_email("userfoo.com").is_err());
        assert!(ensure_valid_email("user@foo@bar.com").is_err());
        assert!(ensure_valid_email("@foo.com").is_err());
        assert!(ensure_valid_email("user@localhost").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(ensure_valid_password("Correct-Horse-9").is_ok());
        assert!(ensure_valid_password("short1!A").is_err());
        assert!(ensure_valid_password("alllowercase-123").is_err());
        assert!(ensure_valid_password("NoDigitsOrSymbols").is_err());
    }

    #[test]
    fn test_new_user_is_normalized() {
        let mut user = NewUser {
            username: "  test-user ".to_string(),
            email: " User@Foo.COM ".to_string(),
            password_hash: "$argon2id$stub".to_string(),
        };
        user.validate().unwrap();
        assert_eq!(user.username, "test-user");
        assert_eq!(user.email, "user@foo.com");
    }

    #[test]
    fn test_new_user_requires_hash() {
        let mut user = NewUser {
            username: "testuser".to_string(),
            email: "user@foo.com".to_string(),
            password_hash: String::new(),
        };
        assert_eq!(user.validate(), Err(ModelValidationError::WeakPassword));
    }
}
