//! Shared primitives for all Rust crates in Gatehouse.

#![forbid(unsafe_code)]

/// Entity identifier newtypes.
pub mod ids;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ids::{AuditEntryId, ConnectionId, ConsentRecordId, UserId, VisitId, VisitorId};

/// Result type used across Gatehouse crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A lightly validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Validation is structural only (one `@`, non-empty local part and a
    /// domain containing a dot); full RFC conformance is the mail provider's
    /// problem.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(format!(
                "'{trimmed}' is not a valid email address"
            )));
        };

        if local.is_empty() || domain.len() < 3 || !domain.contains('.') {
            return Err(AppError::Validation(format!(
                "'{trimmed}' is not a valid email address"
            )));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Returns the normalized address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for EmailAddress {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A lightly validated phone number in loose E.164 shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Creates a validated phone number. Accepts an optional leading `+`,
    /// digits, spaces and dashes; requires at least seven digits.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        let digits = trimmed.chars().filter(char::is_ascii_digit).count();
        let shape_ok = trimmed
            .chars()
            .enumerate()
            .all(|(index, character)| {
                character.is_ascii_digit()
                    || character == ' '
                    || character == '-'
                    || (character == '+' && index == 0)
            });

        if digits < 7 || !shape_ok {
            return Err(AppError::Validation(format!(
                "'{trimmed}' is not a valid phone number"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the phone number as entered, trimmed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PhoneNumber {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is blocked by authorization or business policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The visitor is on the blacklist.
    #[error("visitor is blacklisted{}", reason_suffix(.0))]
    VisitorBlacklisted(Option<String>),

    /// The visitor has no active consent of the required type.
    #[error("visitor has no active {0} consent")]
    ConsentMissing(String),

    /// The visit QR token has passed its expiry.
    #[error("visit token has expired")]
    TokenExpired,

    /// The visit is already in the checked-in state.
    #[error("visit is already checked in")]
    AlreadyCheckedIn,

    /// The visit is not in the checked-in state.
    #[error("visit is not checked in")]
    NotCheckedIn,

    /// The visit has already reached a terminal state.
    #[error("visit is already completed")]
    VisitCompleted,

    /// The operation is illegal while the visit is active.
    #[error("visit is currently active")]
    VisitActive,

    /// Every configured delivery channel failed for a critical event.
    #[error("all delivery channels exhausted for critical notification")]
    DeliveryExhausted,

    /// Too many requests within the active window.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {reason}"),
        None => String::new(),
    }
}
