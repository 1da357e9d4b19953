use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::UserId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Both a start date and an end date are required")]
    MissingDate,

    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Date range of {days} days exceeds the maximum of {max_days} days")]
    DateRangeTooLong { days: i64, max_days: i64 },

    #[error("At least one user must be selected")]
    NoUsersSelected,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Unknown user id: {0}")]
    UnknownUserId(UserId),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid transaction type: {0} (expected INVOICE or PAYMENT)")]
    InvalidTransactionType(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors caused by the report request itself rather than by storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::MissingDate
                | AppError::InvalidDateRange { .. }
                | AppError::DateRangeTooLong { .. }
                | AppError::NoUsersSelected
        )
    }
}
