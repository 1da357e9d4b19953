mod common;

use anyhow::Result;
use billrecon::application::{AppError, ReportRequest};
use billrecon::domain::{TransactionRecord, UserOption};
use billrecon::io::{write_transactions_csv, Exporter, ImportOptions, Importer};
use common::{alice_settled_invoice, parse_date, record_all, test_service, StandardUsers};

const HEADER: &str = concat!(
    "id,transaction_type,transaction_date,created_by,invoice_number,invoice_amount,",
    "payment_number,payment_amount,allocated_amount,balance_amount,description\n",
);

#[tokio::test]
async fn test_user_directory() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;

    let directory = service.user_directory().await?;
    assert_eq!(
        directory,
        vec![
            UserOption {
                id: users.alice.id,
                display_label: "Alice Smith (alice)".to_string(),
            },
            UserOption {
                id: users.bob.id,
                display_label: "bob".to_string(),
            },
        ]
    );

    let duplicate = service.create_user("alice", None).await;
    assert!(matches!(duplicate, Err(AppError::UserAlreadyExists(_))));

    let unknown = service.resolve_user_ids(&[users.bob.id, 999]).await;
    assert!(matches!(unknown, Err(AppError::UnknownUserId(999))));

    Ok(())
}

#[tokio::test]
async fn test_record_requires_known_user() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let record = TransactionRecord::invoice("INV-1", 10000, parse_date("2024-03-01"))
        .with_user("carol");

    let result = service.record_transaction(&record, false).await;
    assert!(matches!(result, Err(AppError::UserNotFound(name)) if name == "carol"));

    service.record_transaction(&record, true).await?;
    let carol = service.get_user("carol").await?;
    assert_eq!(carol.display_label(), "carol");

    let stored = service.list_transactions().await?;
    assert_eq!(stored, vec![record]);

    Ok(())
}

#[tokio::test]
async fn test_import_csv_collects_errors() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardUsers::create(&service).await?;

    let data = format!(
        "{}{}{}{}{}",
        HEADER,
        ",INVOICE,2024-03-01,alice,INV-1,100.00,,,,,\n",
        ",PAYMENT,2024-03-02,alice,INV-1,,PAY-1,abc,,,\n",
        ",PAYMENT,2024-03-02,nobody,INV-1,,PAY-2,10,,,\n",
        ",CREDIT,2024-03-02,alice,,,,,,,\n"
    );

    let importer = Importer::new(&service);
    let result = importer
        .import_transactions_csv(data.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 2);
    assert_eq!(result.errors.len(), 2);

    let mut lines: Vec<usize> = result.errors.iter().map(|e| e.line).collect();
    lines.sort();
    assert_eq!(lines, vec![4, 5]);

    // The malformed payment amount was stored as zero
    let stored = service.list_transactions().await?;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].payment_amount, Some(0));

    Ok(())
}

#[tokio::test]
async fn test_import_dry_run_stores_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardUsers::create(&service).await?;

    let data = format!("{}{}", HEADER, ",INVOICE,2024-03-01,alice,INV-1,100.00,,,,,\n");
    let options = ImportOptions {
        dry_run: true,
        ..ImportOptions::default()
    };

    let result = Importer::new(&service)
        .import_transactions_csv(data.as_bytes(), options)
        .await?;
    assert_eq!(result.imported, 1);
    assert!(service.list_transactions().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_import_json_response_and_skip_duplicates() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;

    let json = r#"{
        "success": true,
        "message": "ok",
        "data": [
            {"id": "6f1c2a44-8f3e-4c7b-9a59-0b0e3f7d2a11", "transactionType": "INVOICE",
             "transactionDate": "2024-05-02T09:00:00Z", "createdByUserName": "bob",
             "invoiceNumber": "INV-9", "invoiceAmount": "50.00"},
            {"id": "0c4d6a52-1e7f-4f3a-8d2b-5e6f7a8b9c0d", "transactionType": "INVOICE",
             "transactionDate": "2024-05-03T09:00:00Z", "createdByUserName": "bob",
             "invoiceNumber": "INV-9", "invoiceAmount": 75}
        ]
    }"#;

    let importer = Importer::new(&service);
    let result = importer
        .import_transactions_json(json.as_bytes(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 2);
    assert!(result.errors.is_empty());

    let options = ImportOptions {
        skip_duplicates: true,
        ..ImportOptions::default()
    };
    let again = importer
        .import_transactions_json(json.as_bytes(), options)
        .await?;
    assert_eq!(again.imported, 0);
    assert_eq!(again.skipped, 2);

    // The later amount for INV-9 wins
    let request = ReportRequest::new(
        parse_date("2024-05-01"),
        parse_date("2024-05-31"),
        vec![users.bob.id],
    );
    let report = service.invoice_payment_report(&request).await?;
    let bob = report.summary.user("bob").unwrap();
    assert_eq!(bob.total_invoice_count, 1);
    assert_eq!(bob.invoices.get("INV-9"), Some(&7500));
    assert_eq!(bob.total_invoice_amount, 7500);

    Ok(())
}

#[tokio::test]
async fn test_import_json_keeps_good_rows_around_a_bad_one() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;

    let json = r#"[
        {"transactionType": "Invoice", "transactionDate": "2024-05-02T09:00:00Z",
         "createdByUserName": "bob", "invoiceNumber": "INV-1", "invoiceAmount": "50.00"},
        {"transactionType": "INVOICE", "createdByUserName": "bob",
         "invoiceNumber": "INV-2", "invoiceAmount": 20},
        {"transactionType": "payment", "transactionDate": "2024-05-03T09:00:00Z",
         "createdByUserName": "bob", "invoiceNumber": "INV-1",
         "paymentNumber": "PAY-1", "paymentAmount": 50}
    ]"#;

    let result = Importer::new(&service)
        .import_transactions_json(json.as_bytes(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].line, 2);

    let request = ReportRequest::new(
        parse_date("2024-05-01"),
        parse_date("2024-05-31"),
        vec![users.bob.id],
    );
    let report = service.invoice_payment_report(&request).await?;
    let bob = report.summary.user("bob").unwrap();
    assert_eq!(bob.total_invoice_count, 1);
    assert_eq!(bob.total_invoice_amount, 5000);
    assert_eq!(bob.total_payment_amount, 5000);

    Ok(())
}

#[tokio::test]
async fn test_import_json_out_of_range_amount_counts_as_zero() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let users = StandardUsers::create(&service).await?;

    let json = r#"[
        {"transactionType": "INVOICE", "transactionDate": "2024-05-02T09:00:00Z",
         "createdByUserName": "alice", "invoiceNumber": "INV-1", "invoiceAmount": 1e17},
        {"transactionType": "INVOICE", "transactionDate": "2024-05-02T10:00:00Z",
         "createdByUserName": "alice", "invoiceNumber": "INV-2", "invoiceAmount": 1}
    ]"#;

    let result = Importer::new(&service)
        .import_transactions_json(json.as_bytes(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 2);

    let request = ReportRequest::new(
        parse_date("2024-05-01"),
        parse_date("2024-05-31"),
        vec![users.alice.id],
    );
    let report = service.invoice_payment_report(&request).await?;
    let alice = report.summary.user("alice").unwrap();
    assert_eq!(alice.total_invoice_count, 2);
    assert_eq!(alice.total_invoice_amount, 100);

    Ok(())
}

#[tokio::test]
async fn test_export_then_import_into_fresh_database() -> Result<()> {
    let (source, _source_temp) = test_service().await?;
    StandardUsers::create(&source).await?;
    record_all(&source, &alice_settled_invoice(parse_date("2024-03-05"))).await?;

    let mut csv = Vec::new();
    let exported = Exporter::new(&source).export_transactions_csv(&mut csv).await?;
    assert_eq!(exported, 3);

    let (target, _target_temp) = test_service().await?;
    let options = ImportOptions {
        create_missing_users: true,
        ..ImportOptions::default()
    };
    let result = Importer::new(&target)
        .import_transactions_csv(csv.as_slice(), options)
        .await?;
    assert_eq!(result.imported, 3);

    let alice = target.get_user("alice").await?;
    let request = ReportRequest::new(
        parse_date("2024-03-01"),
        parse_date("2024-03-31"),
        vec![alice.id],
    );
    let report = target.invoice_payment_report(&request).await?;
    assert_eq!(report.summary.grand_total.total_invoice_amount, 10000);
    assert_eq!(report.summary.grand_total.total_payment_amount, 10000);

    // Same rows written directly match the exported file
    let mut direct = Vec::new();
    write_transactions_csv(&source.list_transactions().await?, &mut direct)?;
    assert_eq!(direct, csv);

    Ok(())
}
