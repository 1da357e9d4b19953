// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use billrecon::application::ReportService;
use billrecon::domain::{TransactionRecord, User};
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(ReportService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = ReportService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: front-desk users
pub struct StandardUsers {
    pub alice: User,
    pub bob: User,
}

impl StandardUsers {
    /// Create alice and bob
    pub async fn create(service: &ReportService) -> Result<Self> {
        let alice = service.create_user("alice", Some("Alice Smith")).await?;
        let bob = service.create_user("bob", None).await?;
        Ok(Self { alice, bob })
    }
}

/// Store every row, failing on the first error
pub async fn record_all(service: &ReportService, records: &[TransactionRecord]) -> Result<()> {
    for record in records {
        service.record_transaction(record, false).await?;
    }
    Ok(())
}

/// Alice's invoice INV-1 (100.00) settled by PAY-1 (60.00) and PAY-2 (40.00)
pub fn alice_settled_invoice(date: DateTime<Utc>) -> Vec<TransactionRecord> {
    vec![
        TransactionRecord::invoice("INV-1", 10000, date).with_user("alice"),
        TransactionRecord::payment("PAY-1", 6000, date)
            .with_user("alice")
            .with_invoice("INV-1", 10000)
            .with_allocation(6000, 4000),
        TransactionRecord::payment("PAY-2", 4000, date)
            .with_user("alice")
            .with_invoice("INV-1", 10000)
            .with_allocation(4000, 0),
    ]
}
