use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use clap::{Args, Parser, Subcommand};

use crate::application::{AppError, InvoicePaymentReport, ReportRequest, ReportService};
use crate::domain::{
    format_cents, parse_cents, partition_shares, summarize, Cents, PartitionShare, ReportSummary,
    TransactionRecord, TransactionType, UserId,
};
use crate::io::{parse_range_end, parse_timestamp};

/// billrecon - Invoice and payment reconciliation reports
#[derive(Parser)]
#[command(name = "billrecon")]
#[command(about = "Per-user invoice and payment reconciliation reports")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "billrecon.db", env = "BILLRECON_DB")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// User directory commands
    #[command(subcommand)]
    User(UserCommands),

    /// Record an invoice or payment row
    Record {
        /// Row type: invoice, payment
        transaction_type: String,

        /// Username of the creating user
        #[arg(short, long)]
        user: Option<String>,

        /// Invoice number
        #[arg(long)]
        invoice: Option<String>,

        /// Invoice amount (e.g., "100.00")
        #[arg(long)]
        invoice_amount: Option<String>,

        /// Payment number
        #[arg(long)]
        payment: Option<String>,

        /// Payment amount (e.g., "60.00")
        #[arg(long)]
        payment_amount: Option<String>,

        /// Amount of the payment allocated to the invoice
        #[arg(long)]
        allocated: Option<String>,

        /// Invoice balance after the allocation
        #[arg(long)]
        balance: Option<String>,

        /// Date of the row (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Create the user if it does not exist
        #[arg(long)]
        create_user: bool,
    },

    /// List stored rows
    Transactions {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Generate reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Summarize rows from a saved report file without a database
    Summarize {
        /// Input file (.json report response or .csv rows)
        input: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Percentage of each LABEL=COUNT partition
    Share {
        /// Partitions, e.g. scheduled=12 completed=30 cancelled=3
        #[arg(required = true)]
        partitions: Vec<String>,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, summary, report
        export_type: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import rows from CSV or a JSON report response
    Import {
        /// Input format: csv, json
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip rows that are already stored
        #[arg(long)]
        skip_duplicates: bool,

        /// Create users that don't exist
        #[arg(long)]
        create_users: bool,

        /// Validate without importing
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user to the directory
    Add {
        /// Username (must be unique)
        username: String,

        /// Full name shown in user pickers
        #[arg(long)]
        full_name: Option<String>,
    },

    /// List users
    List {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Per-user invoice and payment totals
    InvoicePayment {
        #[command(flatten)]
        range: RangeArgs,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Share of invoice and payment rows
    Distribution {
        #[command(flatten)]
        range: RangeArgs,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

/// Date range and user selection of a report.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// Start date (YYYY-MM-DD, defaults to start of current month)
    #[arg(long)]
    pub from: Option<String>,

    /// End date, inclusive of the whole day (YYYY-MM-DD, defaults to now)
    #[arg(long)]
    pub to: Option<String>,

    /// User id to include (repeatable)
    #[arg(long = "user")]
    pub users: Vec<UserId>,

    /// Include every user in the directory
    #[arg(long, conflicts_with = "users")]
    pub all_users: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                ReportService::init(&self.database).await?;
                println!("Initialized database: {}", self.database);
            }

            Commands::User(user_cmd) => {
                let service = ReportService::connect(&self.database).await?;
                run_user_command(&service, user_cmd).await?;
            }

            Commands::Record {
                transaction_type,
                user,
                invoice,
                invoice_amount,
                payment,
                payment_amount,
                allocated,
                balance,
                date,
                description,
                create_user,
            } => {
                let service = ReportService::connect(&self.database).await?;

                let kind = TransactionType::from_str(&transaction_type)
                    .ok_or_else(|| AppError::InvalidTransactionType(transaction_type.clone()))?;
                let timestamp = match date {
                    Some(d) => parse_date(&d)?,
                    None => Utc::now(),
                };

                let mut record = TransactionRecord::new(kind, timestamp);
                record.created_by_user_name = user;
                record.invoice_number = invoice;
                record.invoice_amount = parse_amount_arg(invoice_amount.as_deref())?;
                record.payment_number = payment;
                record.payment_amount = parse_amount_arg(payment_amount.as_deref())?;
                record.allocated_amount = parse_amount_arg(allocated.as_deref())?;
                record.balance_amount = parse_amount_arg(balance.as_deref())?;
                record.description = description;

                service.record_transaction(&record, create_user).await?;
                println!("Recorded {} ({})", record.transaction_type, record.id);
            }

            Commands::Transactions { range } => {
                let service = ReportService::connect(&self.database).await?;
                run_transactions_command(&service, range).await?;
            }

            Commands::Report(report_cmd) => {
                let service = ReportService::connect(&self.database).await?;
                run_report_command(&service, report_cmd).await?;
            }

            Commands::Summarize { input, format } => {
                run_summarize_command(&input, &format)?;
            }

            Commands::Share { partitions } => {
                let counts = partitions
                    .iter()
                    .map(|p| parse_partition(p))
                    .collect::<Result<Vec<_>>>()?;
                print_shares(&partition_shares(&counts));
            }

            Commands::Export {
                export_type,
                range,
                output,
            } => {
                let service = ReportService::connect(&self.database).await?;
                run_export_command(&service, &export_type, range, output.as_deref()).await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
                skip_duplicates,
                create_users,
                validate,
            } => {
                let service = ReportService::connect(&self.database).await?;
                run_import_command(
                    &service,
                    &import_type,
                    input.as_deref(),
                    dry_run,
                    skip_duplicates,
                    create_users,
                    validate,
                )
                .await?;
            }
        }

        Ok(())
    }
}

async fn run_user_command(service: &ReportService, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Add {
            username,
            full_name,
        } => {
            let user = service.create_user(&username, full_name.as_deref()).await?;
            println!("Created user: {} (id {})", user.display_label(), user.id);
        }

        UserCommands::List { format } => match format.as_str() {
            "json" => {
                let directory = service.user_directory().await?;
                println!("{}", serde_json::to_string_pretty(&directory)?);
            }
            _ => {
                let users = service.list_users().await?;
                if users.is_empty() {
                    println!("No users found.");
                } else {
                    println!("{:>6} {:<20} {:<30}", "ID", "USERNAME", "NAME");
                    println!("{}", "-".repeat(58));
                    for user in users {
                        println!(
                            "{:>6} {:<20} {:<30}",
                            user.id,
                            truncate(&user.username, 20),
                            truncate(user.full_name.as_deref().unwrap_or(""), 30)
                        );
                    }
                }
            }
        },
    }
    Ok(())
}

async fn run_transactions_command(service: &ReportService, range: RangeArgs) -> Result<()> {
    let filtered = range.from.is_some() || range.to.is_some() || !range.users.is_empty();

    let records = if filtered || range.all_users {
        let request = build_request(service, range).await?;
        let response = service.fetch_report(&request).await?;
        if !response.success {
            anyhow::bail!(response.message);
        }
        response.data
    } else {
        service.list_transactions().await?
    };

    if records.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    print_transactions(&records);
    Ok(())
}

async fn run_report_command(service: &ReportService, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::InvoicePayment { range, format } => {
            let request = build_request(service, range).await?;
            let report = service.invoice_payment_report(&request).await?;

            match format.as_str() {
                "json" => crate::io::write_report_json(&report, std::io::stdout().lock())?,
                "csv" => {
                    crate::io::write_summary_csv(&report.summary, std::io::stdout().lock())?;
                }
                _ => print_invoice_payment_report(&report),
            }
        }

        ReportCommands::Distribution { range, format } => {
            let request = build_request(service, range).await?;
            let report = service.transaction_type_distribution(&request).await?;

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&report)?),
                _ => {
                    println!("Transaction Type Distribution");
                    println!(
                        "Period: {} to {}",
                        report.from_date.format("%Y-%m-%d"),
                        report.to_date.format("%Y-%m-%d")
                    );
                    println!();
                    print_shares(&report.shares);
                }
            }
        }
    }
    Ok(())
}

fn run_summarize_command(input: &str, format: &str) -> Result<()> {
    let file = std::fs::File::open(input).with_context(|| format!("Failed to open {}", input))?;

    let parsed = if input.to_lowercase().ends_with(".csv") {
        crate::io::parse_transactions_csv(file)
    } else {
        crate::io::parse_transactions_json(file)?
    };

    for err in &parsed.errors {
        tracing::warn!(line = err.line, field = ?err.field, "skipped row: {}", err.error);
    }

    let records = parsed.into_records();
    let summary = summarize(&records);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        "csv" => {
            crate::io::write_summary_csv(&summary, std::io::stdout().lock())?;
        }
        _ => {
            println!("Invoice/Payment Summary ({} rows)", records.len());
            println!();
            print_summary_table(&summary);
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &ReportService,
    export_type: &str,
    range: RangeArgs,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path).context("Failed to create output file")?),
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let count = exporter.export_transactions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "summary" => {
            let request = build_request(service, range).await?;
            let count = exporter.export_summary_csv(&request, writer).await?;
            if output.is_some() {
                eprintln!("Exported summary for {} users", count);
            }
        }
        "report" => {
            let request = build_request(service, range).await?;
            let report = exporter.export_report_json(&request, writer).await?;
            if output.is_some() {
                eprintln!("Exported report with {} rows", report.records.len());
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, summary, report",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &ReportService,
    import_type: &str,
    input: Option<&str>,
    dry_run: bool,
    skip_duplicates: bool,
    create_users: bool,
    validate: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{stdin, Read};

    let importer = Importer::new(service);
    let options = ImportOptions {
        dry_run,
        skip_duplicates,
        create_missing_users: create_users,
        validate_only: validate,
    };

    let reader: Box<dyn Read> = match input {
        Some(path) => Box::new(File::open(path).context("Failed to open input file")?),
        None => Box::new(stdin()),
    };

    let result = match import_type {
        "csv" => importer.import_transactions_csv(reader, options).await?,
        "json" => importer.import_transactions_json(reader, options).await?,
        _ => {
            anyhow::bail!("Invalid import type '{}'. Valid types: csv, json", import_type);
        }
    };

    if dry_run {
        println!("DRY RUN - No data was imported");
    } else if validate {
        println!("VALIDATION - No data was imported");
    }

    println!("Imported: {}", result.imported);
    if result.skipped > 0 {
        println!("Skipped: {}", result.skipped);
    }

    if !result.errors.is_empty() {
        println!("Errors: {}", result.errors.len());
        for err in &result.errors {
            match &err.field {
                Some(field) => println!("  Line {} ({}): {}", err.line, field, err.error),
                None => println!("  Line {}: {}", err.line, err.error),
            }
        }
    }

    Ok(())
}

async fn build_request(service: &ReportService, range: RangeArgs) -> Result<ReportRequest> {
    let (from_date, to_date) = parse_date_range(range.from, range.to)?;

    let user_ids = if range.all_users {
        service
            .list_users()
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect()
    } else {
        service.resolve_user_ids(&range.users).await?;
        range.users
    };

    Ok(ReportRequest::new(from_date, to_date, user_ids))
}

fn print_invoice_payment_report(report: &InvoicePaymentReport) {
    println!("Invoice/Payment Report");
    println!(
        "Period: {} to {}",
        report.from_date.format("%Y-%m-%d"),
        report.to_date.format("%Y-%m-%d")
    );
    println!();

    if report.records.is_empty() {
        println!("No transactions in this period.");
        return;
    }

    print_transactions(&report.records);
    println!();
    print_summary_table(&report.summary);
}

fn print_transactions(records: &[TransactionRecord]) {
    println!(
        "{:<10} {:<8} {:<16} {:<12} {:>12} {:<12} {:>12} {:>12}",
        "DATE", "TYPE", "USER", "INVOICE", "INV AMOUNT", "PAYMENT", "PAY AMOUNT", "BALANCE"
    );
    println!("{}", "-".repeat(102));

    for record in records {
        println!(
            "{:<10} {:<8} {:<16} {:<12} {:>12} {:<12} {:>12} {:>12}",
            record.transaction_date.format("%Y-%m-%d"),
            record.transaction_type.as_str(),
            truncate(record.group_key(), 16),
            truncate(record.invoice_number.as_deref().unwrap_or("-"), 12),
            optional_cents(record.invoice_amount),
            truncate(record.payment_number.as_deref().unwrap_or("-"), 12),
            optional_cents(record.payment_amount),
            optional_cents(record.balance_amount),
        );
    }
}

fn print_summary_table(summary: &ReportSummary) {
    println!(
        "{:<20} {:>9} {:>14} {:>9} {:>14}",
        "USER", "INVOICES", "INVOICED", "PAYMENTS", "RECEIVED"
    );
    println!("{}", "-".repeat(70));

    for user in &summary.users {
        println!(
            "{:<20} {:>9} {:>14} {:>9} {:>14}",
            truncate(&user.user_name, 20),
            user.total_invoice_count,
            format_cents(user.total_invoice_amount),
            user.total_payment_count,
            format_cents(user.total_payment_amount)
        );
    }

    let total = &summary.grand_total;
    println!("{}", "-".repeat(70));
    println!(
        "{:<20} {:>9} {:>14} {:>9} {:>14}",
        "TOTAL",
        total.total_invoice_count,
        format_cents(total.total_invoice_amount),
        total.total_payment_count,
        format_cents(total.total_payment_amount)
    );
}

fn print_shares(shares: &[PartitionShare]) {
    println!("{:<20} {:>8} {:>8}", "PARTITION", "COUNT", "PERCENT");
    println!("{}", "-".repeat(38));
    for share in shares {
        println!(
            "{:<20} {:>8} {:>7}%",
            truncate(&share.label, 20),
            share.count,
            share.percentage
        );
    }
}

fn optional_cents(amount: Option<Cents>) -> String {
    amount.map(format_cents).unwrap_or_else(|| "-".to_string())
}

fn parse_amount_arg(amount: Option<&str>) -> Result<Option<Cents>, AppError> {
    amount
        .map(|s| parse_cents(s).map_err(|e| AppError::InvalidAmount(format!("'{}': {}", s, e))))
        .transpose()
}

fn parse_partition(arg: &str) -> Result<(String, u64)> {
    let (label, count) = arg
        .rsplit_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid partition '{}'. Expected LABEL=COUNT", arg))?;
    let count: u64 = count
        .trim()
        .parse()
        .with_context(|| format!("Invalid count in partition '{}'", arg))?;
    Ok((label.trim().to_string(), count))
}

fn parse_date_range(
    from: Option<String>,
    to: Option<String>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let now = Utc::now();

    // Default to_date is now; a bare date runs to the end of that day
    let to_date = match to {
        Some(date_str) => parse_range_end(&date_str).ok_or_else(|| invalid_date(&date_str))?,
        None => now,
    };

    // Default from_date is start of current month
    let from_date = match from {
        Some(date_str) => parse_date(&date_str)?,
        None => now
            .date_naive()
            .with_day(1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or(now),
    };

    Ok((from_date, to_date))
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(date_str).ok_or_else(|| invalid_date(date_str))
}

fn invalid_date(date_str: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid date '{}'. Expected YYYY-MM-DD or RFC 3339",
        date_str
    )
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
