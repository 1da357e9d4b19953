use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{summarize, PartitionShare, ReportSummary, TransactionRecord};

/// Invoice/payment reconciliation report for a date range and a set of users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePaymentReport {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub records: Vec<TransactionRecord>,
    pub summary: ReportSummary,
}

impl InvoicePaymentReport {
    pub fn new(
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
        records: Vec<TransactionRecord>,
    ) -> Self {
        let summary = summarize(&records);
        Self {
            from_date,
            to_date,
            records,
            summary,
        }
    }
}

/// How report rows split between invoices and payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReport {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub total: u64,
    pub shares: Vec<PartitionShare>,
}
