use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{TransactionId, TransactionRecord, TransactionType, User, UserId};

use super::MIGRATION_001_INITIAL;

const TRANSACTION_COLUMNS: &str = "t.id, t.transaction_type, t.transaction_date, \
     u.username AS created_by, \
     t.invoice_number, t.invoice_amount_cents, t.payment_number, t.payment_amount_cents, \
     t.allocated_amount_cents, t.balance_amount_cents, t.description \
     FROM transactions t LEFT JOIN users u ON u.id = t.created_by_user_id";

/// Timestamps are stored as fixed-width RFC 3339 so they compare correctly as text.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Repository for persisting users and report rows.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // User operations
    // ========================

    /// Insert a user and return it with its assigned id.
    pub async fn save_user(&self, username: &str, full_name: Option<&str>) -> Result<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, full_name, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(full_name)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            full_name: full_name.map(str::to_string),
        })
    }

    /// Get a user by id.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, full_name FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        Ok(row.as_ref().map(Self::row_to_user))
    }

    /// Get a user by username.
    pub async fn get_user_by_name(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, full_name FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by name")?;

        Ok(row.as_ref().map(Self::row_to_user))
    }

    /// List all users ordered by username.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, username, full_name FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        Ok(rows.iter().map(Self::row_to_user).collect())
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> User {
        User {
            id: row.get("id"),
            username: row.get("username"),
            full_name: row.get("full_name"),
        }
    }

    // ========================
    // Transaction operations
    // ========================

    /// Save a report row. The creating user is stored by id.
    pub async fn save_transaction(
        &self,
        record: &TransactionRecord,
        created_by: Option<UserId>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, transaction_type, transaction_date, created_by_user_id,
                invoice_number, invoice_amount_cents, payment_number, payment_amount_cents,
                allocated_amount_cents, balance_amount_cents, description, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.transaction_type.as_str())
        .bind(timestamp(record.transaction_date))
        .bind(created_by)
        .bind(&record.invoice_number)
        .bind(record.invoice_amount)
        .bind(&record.payment_number)
        .bind(record.payment_amount)
        .bind(record.allocated_amount)
        .bind(record.balance_amount)
        .bind(&record.description)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// Check whether a row with this id is already stored.
    pub async fn transaction_exists(&self, id: TransactionId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up transaction")?;
        Ok(row.is_some())
    }

    /// List every stored row in date order.
    pub async fn list_transactions(&self) -> Result<Vec<TransactionRecord>> {
        let query = format!(
            "SELECT {} ORDER BY t.transaction_date, t.sequence",
            TRANSACTION_COLUMNS
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_record).collect()
    }

    /// List rows dated within `[from_date, to_date]` created by one of `user_ids`.
    pub async fn list_transactions_for_report(
        &self,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
        user_ids: &[UserId],
    ) -> Result<Vec<TransactionRecord>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; user_ids.len()].join(", ");
        let query = format!(
            "SELECT {} WHERE t.transaction_date >= ? AND t.transaction_date <= ? \
             AND t.created_by_user_id IN ({}) ORDER BY t.transaction_date, t.sequence",
            TRANSACTION_COLUMNS, placeholders
        );

        let mut sql_query = sqlx::query(&query)
            .bind(timestamp(from_date))
            .bind(timestamp(to_date));
        for user_id in user_ids {
            sql_query = sql_query.bind(*user_id);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list report transactions")?;

        rows.iter().map(Self::row_to_record).collect()
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<TransactionRecord> {
        let id_str: String = row.get("id");
        let type_str: String = row.get("transaction_type");
        let date_str: String = row.get("transaction_date");

        Ok(TransactionRecord {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            transaction_type: TransactionType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
            transaction_date: DateTime::parse_from_rfc3339(&date_str)
                .context("Invalid transaction_date")?
                .with_timezone(&Utc),
            created_by_user_name: row.get("created_by"),
            invoice_number: row.get("invoice_number"),
            invoice_amount: row.get("invoice_amount_cents"),
            payment_number: row.get("payment_number"),
            payment_amount: row.get("payment_amount_cents"),
            allocated_amount: row.get("allocated_amount_cents"),
            balance_amount: row.get("balance_amount_cents"),
            description: row.get("description"),
        })
    }
}
