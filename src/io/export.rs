use anyhow::Result;
use std::io::Write;

use crate::application::{InvoicePaymentReport, ReportRequest, ReportService};
use crate::domain::{format_cents, Cents, ReportSummary, TransactionRecord};

use super::TRANSACTION_CSV_COLUMNS;

fn amount_cell(amount: Option<Cents>) -> String {
    amount.map(format_cents).unwrap_or_default()
}

/// Write a summary as CSV: one row per user, then a TOTAL row.
pub fn write_summary_csv<W: Write>(summary: &ReportSummary, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "user",
        "invoice_count",
        "invoice_amount",
        "payment_count",
        "payment_amount",
    ])?;

    for user in &summary.users {
        csv_writer.write_record([
            user.user_name.clone(),
            user.total_invoice_count.to_string(),
            format_cents(user.total_invoice_amount),
            user.total_payment_count.to_string(),
            format_cents(user.total_payment_amount),
        ])?;
    }

    let total = &summary.grand_total;
    csv_writer.write_record([
        "TOTAL".to_string(),
        total.total_invoice_count.to_string(),
        format_cents(total.total_invoice_amount),
        total.total_payment_count.to_string(),
        format_cents(total.total_payment_amount),
    ])?;

    csv_writer.flush()?;
    Ok(summary.users.len())
}

/// Write report rows as CSV in the layout the importer reads.
pub fn write_transactions_csv<W: Write>(records: &[TransactionRecord], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(TRANSACTION_CSV_COLUMNS)?;

    for record in records {
        csv_writer.write_record([
            record.id.to_string(),
            record.transaction_type.as_str().to_string(),
            record.transaction_date.to_rfc3339(),
            record.created_by_user_name.clone().unwrap_or_default(),
            record.invoice_number.clone().unwrap_or_default(),
            amount_cell(record.invoice_amount),
            record.payment_number.clone().unwrap_or_default(),
            amount_cell(record.payment_amount),
            amount_cell(record.allocated_amount),
            amount_cell(record.balance_amount),
            record.description.clone().unwrap_or_default(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(records.len())
}

/// Write a full report (rows and summary) as pretty JSON.
pub fn write_report_json<W: Write>(report: &InvoicePaymentReport, mut writer: W) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Exporter for writing stored rows and reports to files
pub struct Exporter<'a> {
    service: &'a ReportService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a ReportService) -> Self {
        Self { service }
    }

    /// Export every stored row to CSV
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let records = self.service.list_transactions().await?;
        write_transactions_csv(&records, writer)
    }

    /// Export a report's per-user summary to CSV
    pub async fn export_summary_csv<W: Write>(
        &self,
        request: &ReportRequest,
        writer: W,
    ) -> Result<usize> {
        let report = self.service.invoice_payment_report(request).await?;
        write_summary_csv(&report.summary, writer)
    }

    /// Export a full report to JSON
    pub async fn export_report_json<W: Write>(
        &self,
        request: &ReportRequest,
        writer: W,
    ) -> Result<InvoicePaymentReport> {
        let report = self.service.invoice_payment_report(request).await?;
        write_report_json(&report, writer)?;
        Ok(report)
    }
}
