use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{lenient_amount, Cents};

pub type TransactionId = Uuid;

/// Group label for rows that carry no creating user.
pub const UNKNOWN_USER: &str = "Unknown";

/// Placeholder the back office writes in place of an invoice number.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// A bill raised against a customer
    Invoice,
    /// Money received, possibly allocated across several invoices
    Payment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Invoice => "INVOICE",
            TransactionType::Payment => "PAYMENT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "INVOICE" => Some(TransactionType::Invoice),
            "PAYMENT" => Some(TransactionType::Payment),
            _ => None,
        }
    }
}

/// Reads the type name in any letter case, the same way CSV rows are read.
impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TransactionType::from_str(&s)
            .ok_or_else(|| serde::de::Error::unknown_variant(&s, &["INVOICE", "PAYMENT"]))
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the invoice/payment report.
///
/// Rows are a denormalized join of invoices, payments and allocations, so the same
/// invoice or payment number can appear on several rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    #[serde(default)]
    pub created_by_user_name: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default, with = "lenient_amount")]
    pub invoice_amount: Option<Cents>,
    #[serde(default)]
    pub payment_number: Option<String>,
    #[serde(default, with = "lenient_amount")]
    pub payment_amount: Option<Cents>,
    /// Portion of the payment applied to the invoice on this row
    #[serde(default, with = "lenient_amount")]
    pub allocated_amount: Option<Cents>,
    /// Invoice balance left after this row's allocation
    #[serde(default, with = "lenient_amount")]
    pub balance_amount: Option<Cents>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TransactionRecord {
    pub fn new(transaction_type: TransactionType, transaction_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_type,
            transaction_date,
            created_by_user_name: None,
            invoice_number: None,
            invoice_amount: None,
            payment_number: None,
            payment_amount: None,
            allocated_amount: None,
            balance_amount: None,
            description: None,
        }
    }

    /// Shorthand for an invoice row.
    pub fn invoice(number: impl Into<String>, amount: Cents, date: DateTime<Utc>) -> Self {
        Self::new(TransactionType::Invoice, date).with_invoice(number, amount)
    }

    /// Shorthand for a payment row.
    pub fn payment(number: impl Into<String>, amount: Cents, date: DateTime<Utc>) -> Self {
        Self::new(TransactionType::Payment, date).with_payment(number, amount)
    }

    pub fn with_user(mut self, user_name: impl Into<String>) -> Self {
        self.created_by_user_name = Some(user_name.into());
        self
    }

    pub fn with_invoice(mut self, number: impl Into<String>, amount: Cents) -> Self {
        self.invoice_number = Some(number.into());
        self.invoice_amount = Some(amount);
        self
    }

    /// Reference an invoice by number only, as payment-allocation rows do.
    pub fn with_invoice_ref(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = Some(number.into());
        self
    }

    pub fn with_payment(mut self, number: impl Into<String>, amount: Cents) -> Self {
        self.payment_number = Some(number.into());
        self.payment_amount = Some(amount);
        self
    }

    pub fn with_allocation(mut self, allocated: Cents, balance: Cents) -> Self {
        self.allocated_amount = Some(allocated);
        self.balance_amount = Some(balance);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The user this row is grouped under.
    pub fn group_key(&self) -> &str {
        match self.created_by_user_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => UNKNOWN_USER,
        }
    }

    /// Invoice number and amount, when this row identifies a real invoice.
    pub fn invoice_entry(&self) -> Option<(&str, Cents)> {
        let number = self.invoice_number.as_deref().map(str::trim)?;
        if number.is_empty() || number.eq_ignore_ascii_case(NOT_AVAILABLE) {
            return None;
        }
        Some((number, self.invoice_amount?))
    }

    /// Payment number and amount, when this row identifies a payment.
    pub fn payment_entry(&self) -> Option<(&str, Cents)> {
        let number = self.payment_number.as_deref().map(str::trim)?;
        if number.is_empty() {
            return None;
        }
        Some((number, self.payment_amount?))
    }
}
