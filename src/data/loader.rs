// 📂 Financial Data Loader - reads the fixed-name CSV files of the data directory
// A file that cannot be read becomes an empty table; the pipeline keeps going.

use super::table::Table;
use super::transaction::{bank_transactions, card_transactions, CategoryLookup, Transaction, AMOUNT_COLUMNS};
use crate::config::DataFiles;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CREDIT_CARD_NUMERIC: &[&str] = &["Annual Fee (USD)", "Interest Rate (%)"];
const LOAN_NUMERIC: &[&str] = &["Interest Rate (%)", "Loan Amount (USD)", "Monthly EMI (USD)"];
const CARD_LIST_NUMERIC: &[&str] = &["Credit Limit (USD)", "Current Balance (USD)"];

/// Everything the pipeline reads, one table per input file
#[derive(Debug, Clone, Default)]
pub struct FinancialData {
    pub transactions: Table,
    pub credit_card_transactions: Table,
    pub kyc: Table,
    pub receiver_categories: Table,
    pub social_media: Table,
    pub credit_cards: Table,
    pub loans: Table,
    pub credit_card_list: Table,
    pub emails: Table,
}

impl FinancialData {
    pub fn category_lookup(&self) -> CategoryLookup {
        CategoryLookup::from_table(&self.receiver_categories)
    }

    /// Bank statement lines, debits negative
    pub fn bank_transactions(&self) -> Vec<Transaction> {
        bank_transactions(&self.transactions, &self.category_lookup())
    }

    /// Credit card lines, charges negative
    pub fn card_transactions(&self) -> Vec<Transaction> {
        card_transactions(&self.credit_card_transactions, &self.category_lookup())
    }

    /// Bank and card lines together, bank first
    pub fn all_transactions(&self) -> Vec<Transaction> {
        let lookup = self.category_lookup();
        let mut all = bank_transactions(&self.transactions, &lookup);
        all.extend(card_transactions(&self.credit_card_transactions, &lookup));
        all
    }
}

pub struct FinancialDataLoader {
    data_dir: PathBuf,
    files: DataFiles,
}

impl FinancialDataLoader {
    pub fn new(data_dir: impl Into<PathBuf>, files: DataFiles) -> Self {
        FinancialDataLoader {
            data_dir: data_dir.into(),
            files,
        }
    }

    /// Load all input tables
    pub fn load_all(&self) -> FinancialData {
        let data = FinancialData {
            transactions: self.load("transaction data", &self.files.transactions, AMOUNT_COLUMNS),
            credit_card_transactions: self.load(
                "credit card transactions",
                &self.files.credit_card_transactions,
                AMOUNT_COLUMNS,
            ),
            kyc: self.load("KYC details", &self.files.kyc, &[]),
            receiver_categories: self.load(
                "receiver categories",
                &self.files.receiver_categories,
                &[],
            ),
            social_media: self.load_social_media(None),
            credit_cards: self.load("credit cards", &self.files.credit_cards, CREDIT_CARD_NUMERIC),
            loans: self.load("loans", &self.files.loans, LOAN_NUMERIC),
            credit_card_list: self.load(
                "credit card list",
                &self.files.credit_card_list,
                CARD_LIST_NUMERIC,
            ),
            emails: self.load("emails", &self.files.emails, &[]),
        };

        println!("✓ All data loaded");
        info!(
            transactions = data.transactions.len(),
            card_transactions = data.credit_card_transactions.len(),
            social_posts = data.social_media.len(),
            "Input tables loaded"
        );
        data
    }

    /// Load social media posts from the default file or a custom one
    pub fn load_social_media(&self, custom_file: Option<&Path>) -> Table {
        match custom_file {
            Some(path) => load_table("social media data", path, &[]),
            None => self.load("social media data", &self.files.social_media, &[]),
        }
    }

    /// Customer emails only (grievance analysis needs nothing else)
    pub fn load_emails(&self) -> Table {
        self.load("emails", &self.files.emails, &[])
    }

    fn load(&self, label: &str, file_name: &str, numeric: &[&str]) -> Table {
        load_table(label, &self.data_dir.join(file_name), numeric)
    }
}

fn load_table(label: &str, path: &Path, numeric: &[&str]) -> Table {
    println!("📂 Loading {}...", label);
    match Table::from_path(path, numeric) {
        Ok(table) => table,
        Err(e) => {
            warn!("Error loading {} from {}: {}", label, path.display(), e);
            Table::empty()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
