use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::io::Read;
use uuid::Uuid;

use crate::application::ReportService;
use crate::domain::{coerce_cents, Cents, TransactionRecord, TransactionType};

/// Column order of transaction CSV files, shared with the exporter.
pub const TRANSACTION_CSV_COLUMNS: [&str; 11] = [
    "id",
    "transaction_type",
    "transaction_date",
    "created_by",
    "invoice_number",
    "invoice_amount",
    "payment_number",
    "payment_amount",
    "allocated_amount",
    "balance_amount",
    "description",
];

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_duplicates: bool,
    pub create_missing_users: bool,
    pub validate_only: bool,
}

/// Rows parsed from a file, each with the line it came from.
#[derive(Debug, Clone, Default)]
pub struct ParsedRecords {
    pub records: Vec<(usize, TransactionRecord)>,
    pub errors: Vec<ImportError>,
}

impl ParsedRecords {
    pub fn into_records(self) -> Vec<TransactionRecord> {
        self.records.into_iter().map(|(_, r)| r).collect()
    }
}

/// A saved report-fetch response, or just its rows.
///
/// Rows stay untyped here so one bad row does not reject the whole file.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonPayload {
    Envelope {
        success: bool,
        #[serde(default)]
        message: String,
        #[serde(default)]
        data: Vec<serde_json::Value>,
    },
    Rows(Vec<serde_json::Value>),
}

/// Parse transaction rows from CSV. Bad lines are collected, not fatal.
pub fn parse_transactions_csv<R: Read>(reader: R) -> ParsedRecords {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut parsed = ParsedRecords::default();

    for (line_num, result) in csv_reader.records().enumerate() {
        let line = line_num + 2; // +2 for header and 0-indexing

        let row = match result {
            Ok(r) => r,
            Err(e) => {
                parsed.errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("CSV parse error: {}", e),
                });
                continue;
            }
        };

        match parse_csv_row(&row) {
            Ok(record) => parsed.records.push((line, record)),
            Err((field, error)) => parsed.errors.push(ImportError {
                line,
                field: Some(field.to_string()),
                error,
            }),
        }
    }

    parsed
}

fn parse_csv_row(
    row: &csv::StringRecord,
) -> std::result::Result<TransactionRecord, (&'static str, String)> {
    let text = |idx: usize| {
        row.get(idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let amount = |idx: usize| -> Option<Cents> { text(idx).map(|s| coerce_cents(&s)) };

    let type_str = text(1).unwrap_or_default();
    let transaction_type = TransactionType::from_str(&type_str).ok_or_else(|| {
        (
            "transaction_type",
            format!("Invalid transaction type: '{}'", type_str),
        )
    })?;

    let date_str = text(2).unwrap_or_default();
    let transaction_date = parse_timestamp(&date_str)
        .ok_or_else(|| ("transaction_date", format!("Invalid timestamp: '{}'", date_str)))?;

    let id = match text(0) {
        Some(s) => Uuid::parse_str(&s).map_err(|e| ("id", format!("Invalid id: {}", e)))?,
        None => Uuid::new_v4(),
    };

    Ok(TransactionRecord {
        id,
        transaction_type,
        transaction_date,
        created_by_user_name: text(3),
        invoice_number: text(4),
        invoice_amount: amount(5),
        payment_number: text(6),
        payment_amount: amount(7),
        allocated_amount: amount(8),
        balance_amount: amount(9),
        description: text(10),
    })
}

/// Parse transaction rows from a JSON report-fetch response or a bare array.
pub fn parse_transactions_json<R: Read>(reader: R) -> Result<ParsedRecords> {
    let payload: JsonPayload = serde_json::from_reader(reader)?;

    let rows = match payload {
        JsonPayload::Envelope {
            success: false,
            message,
            ..
        } => anyhow::bail!("Report response was not successful: {}", message),
        JsonPayload::Envelope { data, .. } => data,
        JsonPayload::Rows(rows) => rows,
    };

    // Lines are 1-based row positions within the array
    let mut parsed = ParsedRecords::default();
    for (index, row) in rows.into_iter().enumerate() {
        let line = index + 1;
        match serde_json::from_value::<TransactionRecord>(row) {
            Ok(record) => parsed.records.push((line, record)),
            Err(e) => parsed.errors.push(ImportError {
                line,
                field: None,
                error: format!("Invalid row: {}", e),
            }),
        }
    }

    Ok(parsed)
}

/// Importer for loading report rows into the store
pub struct Importer<'a> {
    service: &'a ReportService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a ReportService) -> Self {
        Self { service }
    }

    /// Import transaction rows from CSV
    pub async fn import_transactions_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        self.store(parse_transactions_csv(reader), &options).await
    }

    /// Import transaction rows from a JSON report-fetch response
    pub async fn import_transactions_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        self.store(parse_transactions_json(reader)?, &options).await
    }

    async fn store(&self, parsed: ParsedRecords, options: &ImportOptions) -> Result<ImportResult> {
        let mut result = ImportResult {
            errors: parsed.errors,
            ..ImportResult::default()
        };

        for (line, record) in parsed.records {
            if self.service.has_transaction(&record).await? {
                if options.skip_duplicates {
                    tracing::debug!(line, id = %record.id, "skipping duplicate row");
                    result.skipped += 1;
                } else {
                    result.errors.push(ImportError {
                        line,
                        field: Some("id".to_string()),
                        error: format!("Transaction already exists: {}", record.id),
                    });
                }
                continue;
            }

            // Skip actual import if dry run or validate only
            if options.dry_run || options.validate_only {
                result.imported += 1;
                continue;
            }

            match self
                .service
                .record_transaction(&record, options.create_missing_users)
                .await
            {
                Ok(()) => result.imported += 1,
                Err(e) => {
                    tracing::warn!(line, error = %e, "failed to import row");
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("Transaction creation failed: {}", e),
                    });
                }
            }
        }

        Ok(result)
    }
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse the inclusive end of a date range. A plain `YYYY-MM-DD` date covers the whole
/// day, so it resolves to the last microsecond before midnight.
pub fn parse_range_end(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(date) => date
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .map(|dt| dt.and_utc()),
        Err(_) => parse_timestamp(s),
    }
}
