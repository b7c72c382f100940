use rusqlite::ffi;
use thiserror::Error;
use twofold_types::models::UnknownPartner;

use crate::migrations::KNOWN_PARTNER_CHECK;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Every way a store operation can be rejected. Nothing here is retried by
/// the store; the caller decides.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A foreign key or primary key would be broken.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A unique column already holds this value.
    #[error("uniqueness violation: {0}")]
    UniquenessViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A user identifier outside the fixed pair.
    #[error("invalid enum value: {0}")]
    InvalidEnum(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "refusing to reset a populated store ({questions} questions, {answers} answers) without force"
    )]
    ResetRefused { questions: i64, answers: i64 },

    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

impl From<UnknownPartner> for StoreError {
    fn from(err: UnknownPartner) -> Self {
        Self::InvalidEnum(err.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &err {
            if code.code == rusqlite::ErrorCode::ConstraintViolation {
                let detail = message.clone().unwrap_or_else(|| err.to_string());
                return match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE => Self::UniquenessViolation(detail),
                    ffi::SQLITE_CONSTRAINT_CHECK if detail.ends_with(KNOWN_PARTNER_CHECK) => {
                        Self::InvalidEnum(detail)
                    }
                    _ => Self::ConstraintViolation(detail),
                };
            }
        }
        Self::Sqlite(err)
    }
}

impl StoreError {
    /// True for the failures caused by the data the caller supplied rather
    /// than by the store itself.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ConstraintViolation(_)
                | Self::UniquenessViolation(_)
                | Self::NotFound(_)
                | Self::InvalidEnum(_)
                | Self::InvalidInput(_)
                | Self::ResetRefused { .. }
        )
    }
}
