use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{TransactionRecord, UserId};

use super::AppError;

/// Longest date span a single report may cover.
pub const MAX_REPORT_DAYS: i64 = 365;

/// Parameters of an invoice/payment report fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_ids: Vec<UserId>,
}

impl ReportRequest {
    pub fn new(
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        user_ids: Vec<UserId>,
    ) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            user_ids,
        }
    }

    /// Check the request and return its date range.
    pub fn validate(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let (start, end) = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(AppError::MissingDate),
        };

        if start > end {
            return Err(AppError::InvalidDateRange { start, end });
        }

        let span = end - start;
        if span > Duration::days(MAX_REPORT_DAYS) {
            // Any part of a day counts as a whole day
            let whole_days = span.num_days();
            let days = if span > Duration::days(whole_days) {
                whole_days + 1
            } else {
                whole_days
            };
            return Err(AppError::DateRangeTooLong {
                days,
                max_days: MAX_REPORT_DAYS,
            });
        }

        if self.user_ids.is_empty() {
            return Err(AppError::NoUsersSelected);
        }

        Ok((start, end))
    }
}

/// Envelope returned by a report fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<TransactionRecord>,
}

impl ReportResponse {
    pub fn ok(data: Vec<TransactionRecord>) -> Self {
        Self {
            success: true,
            message: format!("Found {} transactions", data.len()),
            data,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Vec::new(),
        }
    }
}
