use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{Cents, TransactionRecord};

/// Invoice and payment totals for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_name: String,
    /// Invoice number -> amount, one entry per distinct invoice
    pub invoices: BTreeMap<String, Cents>,
    /// Payment number -> amount, one entry per distinct payment
    pub payments: BTreeMap<String, Cents>,
    pub total_invoice_count: usize,
    pub total_invoice_amount: Cents,
    pub total_payment_count: usize,
    pub total_payment_amount: Cents,
}

/// Totals across every user in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrandTotal {
    pub total_invoice_count: usize,
    pub total_invoice_amount: Cents,
    pub total_payment_count: usize,
    pub total_payment_amount: Cents,
}

impl GrandTotal {
    fn add(&mut self, user: &UserSummary) {
        self.total_invoice_count += user.total_invoice_count;
        self.total_invoice_amount = self
            .total_invoice_amount
            .saturating_add(user.total_invoice_amount);
        self.total_payment_count += user.total_payment_count;
        self.total_payment_amount = self
            .total_payment_amount
            .saturating_add(user.total_payment_amount);
    }
}

/// Per-user summaries, in the order users first appear, plus the grand total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub users: Vec<UserSummary>,
    pub grand_total: GrandTotal,
}

impl ReportSummary {
    pub fn user(&self, user_name: &str) -> Option<&UserSummary> {
        self.users.iter().find(|u| u.user_name == user_name)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

struct UserAccumulator {
    user_name: String,
    invoices: BTreeMap<String, Cents>,
    payments: BTreeMap<String, Cents>,
}

impl UserAccumulator {
    fn new(user_name: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            invoices: BTreeMap::new(),
            payments: BTreeMap::new(),
        }
    }

    fn freeze(self) -> UserSummary {
        UserSummary {
            total_invoice_count: self.invoices.len(),
            total_invoice_amount: sum_amounts(&self.invoices),
            total_payment_count: self.payments.len(),
            total_payment_amount: sum_amounts(&self.payments),
            user_name: self.user_name,
            invoices: self.invoices,
            payments: self.payments,
        }
    }
}

/// Sums clamp at the `Cents` range instead of wrapping.
fn sum_amounts(amounts: &BTreeMap<String, Cents>) -> Cents {
    amounts
        .values()
        .fold(0, |total: Cents, amount| total.saturating_add(*amount))
}

/// Summarize report rows per user and overall.
///
/// Invoices and payments are counted once per number, however many allocation rows
/// repeat them. When a number repeats with a different amount, the later row wins.
pub fn summarize(records: &[TransactionRecord]) -> ReportSummary {
    let mut accumulators: Vec<UserAccumulator> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let key = record.group_key();
        let slot = *index.entry(key).or_insert_with(|| {
            accumulators.push(UserAccumulator::new(key));
            accumulators.len() - 1
        });
        let acc = &mut accumulators[slot];

        if let Some((number, amount)) = record.invoice_entry() {
            acc.invoices.insert(number.to_string(), amount);
        }
        if let Some((number, amount)) = record.payment_entry() {
            acc.payments.insert(number.to_string(), amount);
        }
    }

    let users: Vec<UserSummary> = accumulators
        .into_iter()
        .map(UserAccumulator::freeze)
        .collect();

    let mut grand_total = GrandTotal::default();
    for user in &users {
        grand_total.add(user);
    }

    ReportSummary { users, grand_total }
}
