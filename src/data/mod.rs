// Data layer: CSV tables, typed transactions, and the loader for the data directory

pub mod loader;
pub mod table;
pub mod transaction;

pub use loader::{FinancialData, FinancialDataLoader};
pub use table::{column_f64, column_str, parse_number, Record, Table};
pub use transaction::{parse_date, CategoryLookup, Transaction, TransactionSource};
