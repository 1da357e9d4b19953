use crate::domain::{
    partition_shares, TransactionRecord, TransactionType, User, UserId, UserOption,
};
use crate::storage::Repository;

use super::{AppError, DistributionReport, InvoicePaymentReport, ReportRequest, ReportResponse};

/// Application service providing the report operations.
/// This is the primary interface for any client (CLI, API, etc.).
pub struct ReportService {
    repo: Repository,
}

impl ReportService {
    /// Create a new report service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // User directory
    // ========================

    /// Create a new user.
    pub async fn create_user(
        &self,
        username: &str,
        full_name: Option<&str>,
    ) -> Result<User, AppError> {
        let username = username.trim();
        if self.repo.get_user_by_name(username).await?.is_some() {
            return Err(AppError::UserAlreadyExists(username.to_string()));
        }

        let user = self.repo.save_user(username, full_name).await?;
        tracing::debug!(id = user.id, username = %user.username, "created user");
        Ok(user)
    }

    /// Look up a user by username.
    pub async fn get_user(&self, username: &str) -> Result<User, AppError> {
        self.repo
            .get_user_by_name(username.trim())
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// List all users.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.repo.list_users().await?)
    }

    /// `{id, displayLabel}` pairs for picking report users.
    pub async fn user_directory(&self) -> Result<Vec<UserOption>, AppError> {
        let users = self.repo.list_users().await?;
        Ok(users.iter().map(UserOption::from).collect())
    }

    /// Resolve user ids into users, failing on the first unknown id.
    pub async fn resolve_user_ids(&self, user_ids: &[UserId]) -> Result<Vec<User>, AppError> {
        let mut users = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            let user = self
                .repo
                .get_user(*id)
                .await?
                .ok_or(AppError::UnknownUserId(*id))?;
            users.push(user);
        }
        Ok(users)
    }

    // ========================
    // Transaction rows
    // ========================

    /// Store a report row.
    ///
    /// The row's `created_by_user_name` must name an existing user unless
    /// `create_missing_user` is set. Rows without a user are stored unassigned.
    pub async fn record_transaction(
        &self,
        record: &TransactionRecord,
        create_missing_user: bool,
    ) -> Result<(), AppError> {
        let created_by = match record.created_by_user_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => match self.repo.get_user_by_name(name).await? {
                Some(user) => Some(user.id),
                None if create_missing_user => Some(self.create_user(name, None).await?.id),
                None => return Err(AppError::UserNotFound(name.to_string())),
            },
            _ => None,
        };

        self.repo.save_transaction(record, created_by).await?;
        tracing::debug!(
            id = %record.id,
            transaction_type = %record.transaction_type,
            "recorded transaction"
        );
        Ok(())
    }

    /// Check whether a row is already stored.
    pub async fn has_transaction(&self, record: &TransactionRecord) -> Result<bool, AppError> {
        Ok(self.repo.transaction_exists(record.id).await?)
    }

    /// List every stored row.
    pub async fn list_transactions(&self) -> Result<Vec<TransactionRecord>, AppError> {
        Ok(self.repo.list_transactions().await?)
    }

    // ========================
    // Reports
    // ========================

    /// Fetch report rows.
    ///
    /// An invalid request yields an unsuccessful response carrying the reason;
    /// only storage failures are returned as errors.
    pub async fn fetch_report(&self, request: &ReportRequest) -> Result<ReportResponse, AppError> {
        let (from_date, to_date) = match request.validate() {
            Ok(range) => range,
            Err(e) if e.is_validation() => {
                tracing::warn!(error = %e, "rejected report request");
                return Ok(ReportResponse::failed(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let records = self
            .repo
            .list_transactions_for_report(from_date, to_date, &request.user_ids)
            .await?;
        tracing::debug!(
            rows = records.len(),
            users = request.user_ids.len(),
            "fetched report rows"
        );

        Ok(ReportResponse::ok(records))
    }

    /// Fetch and summarize an invoice/payment report.
    pub async fn invoice_payment_report(
        &self,
        request: &ReportRequest,
    ) -> Result<InvoicePaymentReport, AppError> {
        let (from_date, to_date) = request.validate()?;
        let records = self
            .repo
            .list_transactions_for_report(from_date, to_date, &request.user_ids)
            .await?;

        let report = InvoicePaymentReport::new(from_date, to_date, records);
        tracing::debug!(
            rows = report.records.len(),
            users = report.summary.users.len(),
            "summarized invoice/payment report"
        );
        Ok(report)
    }

    /// Share of invoice and payment rows in a report.
    pub async fn transaction_type_distribution(
        &self,
        request: &ReportRequest,
    ) -> Result<DistributionReport, AppError> {
        let (from_date, to_date) = request.validate()?;
        let records = self
            .repo
            .list_transactions_for_report(from_date, to_date, &request.user_ids)
            .await?;

        let count = |kind: TransactionType| {
            records
                .iter()
                .filter(|r| r.transaction_type == kind)
                .count() as u64
        };
        let counts = [
            (TransactionType::Invoice.as_str(), count(TransactionType::Invoice)),
            (TransactionType::Payment.as_str(), count(TransactionType::Payment)),
        ];

        Ok(DistributionReport {
            from_date,
            to_date,
            total: counts.iter().map(|(_, c)| c).sum(),
            shares: partition_shares(&counts),
        })
    }
}
