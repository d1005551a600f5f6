pub mod notebook;
pub mod user;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelValidationError {
    #[error(
        "username must be 1-150 ASCII characters consisting of letters, digits, or @ . + - _"
    )]
    InvalidUsername,
    #[error("email must contain a single '@' and a domain section")]
    InvalidEmail,
    #[error(
        "password must be at least 12 characters and include upper, lower, digit, and symbol characters"
    )]
    WeakPassword,
    #[error("title must be between 1 and 120 visible characters")]
    InvalidTitle,
    #[error("revision content must not exceed {0} bytes")]
    ContentTooLarge(usize),
    #[error("identifier must be a valid, non-nil UUID")]
    InvalidId,
}

pub type ValidationResult<T> = Result<T, ModelValidationError>;
