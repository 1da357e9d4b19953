mod common;

use anyhow::Result;
use billrecon::application::{AppError, ReportRequest};
use billrecon::domain::{GrandTotal, TransactionRecord};
use billrecon::io::{parse_range_end, parse_timestamp};
use chrono::{DateTime, Utc};
use common::{alice_settled_invoice, parse_date, record_all, test_service, StandardUsers};

#[tokio::test]
async fn test_invoice_payment_report_counts_invoice_once() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;

    record_all(&service, &alice_settled_invoice(parse_date("2024-03-05"))).await?;

    let request = ReportRequest::new(
        parse_date("2024-03-01"),
        parse_date("2024-03-31"),
        vec![users.alice.id],
    );
    let report = service.invoice_payment_report(&request).await?;

    assert_eq!(report.records.len(), 3);
    assert_eq!(report.summary.users.len(), 1);

    let alice = report.summary.user("alice").unwrap();
    assert_eq!(alice.total_invoice_count, 1);
    assert_eq!(alice.total_invoice_amount, 10000);
    assert_eq!(alice.total_payment_count, 2);
    assert_eq!(alice.total_payment_amount, 10000);

    assert_eq!(
        report.summary.grand_total,
        GrandTotal {
            total_invoice_count: 1,
            total_invoice_amount: 10000,
            total_payment_count: 2,
            total_payment_amount: 10000,
        }
    );

    Ok(())
}

#[tokio::test]
async fn test_report_filters_by_date_and_user() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;

    record_all(
        &service,
        &[
            TransactionRecord::invoice("INV-1", 5000, parse_date("2024-01-01")).with_user("alice"),
            TransactionRecord::invoice("INV-2", 7000, parse_date("2024-01-31")).with_user("alice"),
            TransactionRecord::invoice("INV-3", 9000, parse_date("2024-02-01")).with_user("alice"),
            TransactionRecord::invoice("INV-4", 1100, parse_date("2024-01-15")).with_user("bob"),
            TransactionRecord::payment("PAY-9", 2500, parse_date("2024-01-20")),
        ],
    )
    .await?;

    // Both bounds are inclusive; February and unassigned rows are left out
    let request = ReportRequest::new(
        parse_date("2024-01-01"),
        parse_date("2024-01-31"),
        vec![users.alice.id],
    );
    let response = service.fetch_report(&request).await?;
    assert!(response.success);
    let numbers: Vec<_> = response
        .data
        .iter()
        .map(|r| r.invoice_number.clone().unwrap())
        .collect();
    assert_eq!(numbers, vec!["INV-1", "INV-2"]);
    assert_eq!(response.message, "Found 2 transactions");

    let request = ReportRequest::new(
        parse_date("2024-01-01"),
        parse_date("2024-01-31"),
        vec![users.alice.id, users.bob.id],
    );
    let report = service.invoice_payment_report(&request).await?;
    assert_eq!(report.summary.users.len(), 2);
    assert_eq!(report.summary.grand_total.total_invoice_count, 3);
    assert_eq!(report.summary.grand_total.total_invoice_amount, 5000 + 7000 + 1100);

    // Rows come back in date order, so bob's mid-month invoice sits between alice's
    let users_in_order: Vec<_> = report
        .summary
        .users
        .iter()
        .map(|u| u.user_name.as_str())
        .collect();
    assert_eq!(users_in_order, vec!["alice", "bob"]);

    Ok(())
}

#[tokio::test]
async fn test_bare_end_date_includes_rows_later_that_day() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;

    let afternoon: DateTime<Utc> = "2024-01-31T15:00:00Z".parse()?;
    let next_morning: DateTime<Utc> = "2024-02-01T00:00:00Z".parse()?;
    record_all(
        &service,
        &[
            TransactionRecord::invoice("INV-1", 5000, afternoon).with_user("alice"),
            TransactionRecord::invoice("INV-2", 7000, next_morning).with_user("alice"),
        ],
    )
    .await?;

    let request = ReportRequest::new(
        parse_timestamp("2024-01-01").unwrap(),
        parse_range_end("2024-01-31").unwrap(),
        vec![users.alice.id],
    );
    let response = service.fetch_report(&request).await?;
    assert!(response.success);
    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0].invoice_number.as_deref(), Some("INV-1"));

    Ok(())
}

#[tokio::test]
async fn test_fetch_report_rejects_invalid_requests() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardUsers::create(&service).await?;

    let no_users = ReportRequest::new(parse_date("2024-01-01"), parse_date("2024-01-31"), vec![]);
    let response = service.fetch_report(&no_users).await?;
    assert!(!response.success);
    assert!(response.data.is_empty());
    assert_eq!(response.message, "At least one user must be selected");

    let too_long = ReportRequest::new(parse_date("2023-01-01"), parse_date("2024-06-01"), vec![1]);
    let response = service.fetch_report(&too_long).await?;
    assert!(!response.success);
    assert!(response.message.contains("exceeds the maximum of 365 days"));

    let result = service.invoice_payment_report(&no_users).await;
    assert!(matches!(result, Err(AppError::NoUsersSelected)));

    let backwards = ReportRequest::new(parse_date("2024-02-01"), parse_date("2024-01-01"), vec![1]);
    let result = service.invoice_payment_report(&backwards).await;
    assert!(matches!(result, Err(AppError::InvalidDateRange { .. })));

    Ok(())
}

#[tokio::test]
async fn test_empty_report_has_zero_totals() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;

    let request = ReportRequest::new(
        parse_date("2024-01-01"),
        parse_date("2024-01-31"),
        vec![users.alice.id, users.bob.id],
    );
    let report = service.invoice_payment_report(&request).await?;

    assert!(report.records.is_empty());
    assert!(report.summary.is_empty());
    assert_eq!(report.summary.grand_total, GrandTotal::default());

    Ok(())
}

#[tokio::test]
async fn test_payment_split_across_invoices() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;
    let date = parse_date("2024-04-10");

    // PAY-1 (150.00) settles INV-1 (100.00) and INV-2 (50.00): two rows each way
    record_all(
        &service,
        &[
            TransactionRecord::invoice("INV-1", 10000, date).with_user("bob"),
            TransactionRecord::invoice("INV-2", 5000, date).with_user("bob"),
            TransactionRecord::payment("PAY-1", 15000, date)
                .with_user("bob")
                .with_invoice("INV-1", 10000)
                .with_allocation(10000, 0),
            TransactionRecord::payment("PAY-1", 15000, date)
                .with_user("bob")
                .with_invoice("INV-2", 5000)
                .with_allocation(5000, 0),
        ],
    )
    .await?;

    let request = ReportRequest::new(
        parse_date("2024-04-01"),
        parse_date("2024-04-30"),
        vec![users.bob.id],
    );
    let report = service.invoice_payment_report(&request).await?;

    let bob = report.summary.user("bob").unwrap();
    assert_eq!(bob.total_invoice_count, 2);
    assert_eq!(bob.total_invoice_amount, 15000);
    assert_eq!(bob.total_payment_count, 1);
    assert_eq!(bob.total_payment_amount, 15000);

    Ok(())
}

#[tokio::test]
async fn test_transaction_type_distribution() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;

    record_all(&service, &alice_settled_invoice(parse_date("2024-03-05"))).await?;

    let request = ReportRequest::new(
        parse_date("2024-03-01"),
        parse_date("2024-03-31"),
        vec![users.alice.id],
    );
    let distribution = service.transaction_type_distribution(&request).await?;
    assert_eq!(distribution.total, 3);
    assert_eq!(distribution.shares[0].label, "INVOICE");
    assert_eq!(distribution.shares[0].percentage, 33);
    assert_eq!(distribution.shares[1].label, "PAYMENT");
    assert_eq!(distribution.shares[1].percentage, 67);

    // No rows for bob: every share is zero rather than NaN
    let request = ReportRequest::new(
        parse_date("2024-03-01"),
        parse_date("2024-03-31"),
        vec![users.bob.id],
    );
    let distribution = service.transaction_type_distribution(&request).await?;
    assert_eq!(distribution.total, 0);
    assert!(distribution.shares.iter().all(|s| s.percentage == 0));

    Ok(())
}
