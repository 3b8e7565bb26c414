//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when caller input is malformed.
//! - [`NotFoundOrForbidden`] thrown when a record is absent or owned by
//!   another user.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`NotFoundOrForbidden`]: EngineError::NotFoundOrForbidden
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Username \"{0}\" already exists!")]
    UsernameTaken(String),
    #[error("User \"{0}\" not found!")]
    UserNotFound(String),
    #[error("Invalid password")]
    InvalidPassword,
    #[error("\"{0}\" not found or access denied")]
    NotFoundOrForbidden(String),
    #[error("Counterparty \"{0}\" does not exist")]
    UnknownCounterparty(String),
    #[error("Share amounts do not match the total: {0}")]
    AmountMismatch(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error(transparent)]
    Database(DbErr),
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        // Connection-level faults mean the store is unreachable; everything
        // else is a query/constraint error surfaced as-is.
        if matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) {
            Self::StoreUnavailable(err.to_string())
        } else {
            Self::Database(err)
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::UsernameTaken(a), Self::UsernameTaken(b)) => a == b,
            (Self::UserNotFound(a), Self::UserNotFound(b)) => a == b,
            (Self::InvalidPassword, Self::InvalidPassword) => true,
            (Self::NotFoundOrForbidden(a), Self::NotFoundOrForbidden(b)) => a == b,
            (Self::UnknownCounterparty(a), Self::UnknownCounterparty(b)) => a == b,
            (Self::AmountMismatch(a), Self::AmountMismatch(b)) => a == b,
            (Self::StoreUnavailable(a), Self::StoreUnavailable(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
