// 💳 Transactions - typed view over the bank and card statement tables

use super::table::{column_f64, column_str, Record, Table};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Which statement a transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    Bank,
    CreditCard,
}

impl TransactionSource {
    pub fn name(&self) -> &str {
        match self {
            TransactionSource::Bank => "bank",
            TransactionSource::CreditCard => "credit_card",
        }
    }
}

/// A statement line with its sign resolved.
///
/// `amount` is negative for money leaving the customer (spending) and
/// positive for money coming in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: f64,
    pub counterparty: String,
    pub category: String,
    pub transaction_type: Option<String>,
    pub card_id: Option<String>,
    pub source: TransactionSource,
}

impl Transaction {
    pub fn is_spending(&self) -> bool {
        self.amount < 0.0
    }

    /// Spending magnitude (0 for inflows)
    pub fn spend(&self) -> f64 {
        if self.is_spending() {
            -self.amount
        } else {
            0.0
        }
    }

    /// Calendar month key, e.g. "2024-03"
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

pub const AMOUNT_COLUMNS: &[&str] = &["Amount (USD)", "Amount ($)"];
const DEFAULT_CATEGORY: &str = "Other";

// ============================================================================
// CATEGORY LOOKUP
// ============================================================================

/// Receiver -> category mapping from Receiver_vs_Category.csv
#[derive(Debug, Clone, Default)]
pub struct CategoryLookup {
    by_receiver: HashMap<String, String>,
}

impl CategoryLookup {
    pub fn from_table(table: &Table) -> Self {
        let mut by_receiver = HashMap::new();
        for row in table.rows() {
            if let (Some(receiver), Some(category)) = (
                column_str(row, &["Receiver", "Merchant"]),
                column_str(row, &["Category"]),
            ) {
                by_receiver.insert(receiver, category);
            }
        }
        CategoryLookup { by_receiver }
    }

    pub fn get(&self, receiver: &str) -> Option<&str> {
        self.by_receiver.get(receiver).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_receiver.is_empty()
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse the date formats seen in exported statements
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    // "2024-03-05 14:22:00" style timestamps
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Build bank transactions. Rows typed as debits are spending.
pub fn bank_transactions(table: &Table, lookup: &CategoryLookup) -> Vec<Transaction> {
    table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let tx = build(row, idx, TransactionSource::Bank, &["Receiver", "Merchant"], lookup)?;
            let is_debit = tx
                .transaction_type
                .as_deref()
                .map(|t| t.to_lowercase().contains("debit"))
                .unwrap_or(false);
            let magnitude = tx.amount.abs();
            Some(Transaction {
                amount: if is_debit { -magnitude } else { magnitude },
                ..tx
            })
        })
        .collect()
}

/// Build card transactions. Charges are spending; credits, payments and
/// refunds flow back in.
pub fn card_transactions(table: &Table, lookup: &CategoryLookup) -> Vec<Transaction> {
    table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let tx = build(
                row,
                idx,
                TransactionSource::CreditCard,
                &["Merchant", "Receiver"],
                lookup,
            )?;
            let is_inflow = tx
                .transaction_type
                .as_deref()
                .map(|t| {
                    let t = t.to_lowercase();
                    t.contains("credit") || t.contains("payment") || t.contains("refund")
                })
                .unwrap_or(false);
            let magnitude = tx.amount.abs();
            Some(Transaction {
                amount: if is_inflow { magnitude } else { -magnitude },
                ..tx
            })
        })
        .collect()
}

fn build(
    row: &Record,
    idx: usize,
    source: TransactionSource,
    counterparty_columns: &[&str],
    lookup: &CategoryLookup,
) -> Option<Transaction> {
    let line = idx + 2; // 1-indexed + header row

    let date = match column_str(row, &["Date"]).as_deref().and_then(parse_date) {
        Some(d) => d,
        None => {
            warn!("Skipping {} row {}: missing or invalid date", source.name(), line);
            return None;
        }
    };

    let amount = match column_f64(row, AMOUNT_COLUMNS) {
        Some(a) => a,
        None => {
            warn!("Skipping {} row {}: missing or invalid amount", source.name(), line);
            return None;
        }
    };

    let counterparty =
        column_str(row, counterparty_columns).unwrap_or_else(|| "Unknown".to_string());

    let category = column_str(row, &["Category"])
        .or_else(|| lookup.get(&counterparty).map(|c| c.to_string()))
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    Some(Transaction {
        date,
        amount,
        counterparty,
        category,
        transaction_type: column_str(row, &["Transaction Type"]),
        card_id: column_str(row, &["Card ID"]),
        source,
    })
}

// ============================================================================
// TESTS
// ============================================================================
