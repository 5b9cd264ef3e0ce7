// 📄 CSV Tables - flat records read straight from disk
// Rows keep column order so they can be re-serialized as the source had them.

use crate::error::Result;
use serde_json::{Map, Value};
use std::fs::File;
use std::path::Path;

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// An empty table (stand-in for a file that could not be loaded)
    pub fn empty() -> Self {
        Table::default()
    }

    /// Load a CSV file, coercing `numeric_columns` to numbers
    pub fn from_path(path: &Path, numeric_columns: &[&str]) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, numeric_columns)
    }

    pub fn from_reader<R: std::io::Read>(reader: R, numeric_columns: &[&str]) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let mut row = Map::new();
            for (idx, header) in headers.iter().enumerate() {
                let cell = record.get(idx).unwrap_or("");
                let value = if numeric_columns.contains(&header.as_str()) {
                    coerce_numeric(cell)
                } else {
                    infer_value(cell)
                };
                row.insert(header.clone(), value);
            }
            rows.push(row);
        }

        Ok(Table { headers, rows })
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
        Table { headers, rows: records }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Rows as a list of column -> value objects
    pub fn records(&self) -> Vec<Record> {
        self.rows.clone()
    }

    pub fn first(&self) -> Option<&Record> {
        self.rows.first()
    }
}

/// First non-null string value among column aliases
pub fn column_str(row: &Record, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match row.get(*name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// First numeric value among column aliases
pub fn column_f64(row: &Record, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|name| match row.get(*name) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s),
        _ => None,
    })
}

/// Parse "1,234.50", "$45.99", "-$855.94" and plain numbers
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let negative = trimmed.starts_with('-');
    let cleaned: String = trimmed
        .trim_start_matches('-')
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();

    let value = cleaned.parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

fn coerce_numeric(cell: &str) -> Value {
    parse_number(cell)
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn infer_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const CARDS: &str = "\
Card Name,Annual Fee (USD),Interest Rate (%),Rewards
Active Cash, 0 ,20.24,2% cash back
Autograph,$95,N/A,3x points
";

    #[test]
    fn test_numeric_coercion() {
        let table =
            Table::from_reader(CARDS.as_bytes(), &["Annual Fee (USD)", "Interest Rate (%)"]).unwrap();

        assert_eq!(table.len(), 2);
        let first = &table.rows()[0];
        assert_eq!(first["Card Name"], Value::String("Active Cash".to_string()));
        assert_eq!(column_f64(first, &["Annual Fee (USD)"]), Some(0.0));
        assert_eq!(column_f64(first, &["Interest Rate (%)"]), Some(20.24));

        let second = &table.rows()[1];
        assert_eq!(column_f64(second, &["Annual Fee (USD)"]), Some(95.0));
        assert_eq!(second["Interest Rate (%)"], Value::Null);
    }

    #[test]
    fn test_inferred_values_and_column_order() {
        let table = Table::from_reader("Name,Age,City\nJane Doe,34,Austin\n".as_bytes(), &[]).unwrap();
        let row = &table.rows()[0];
        assert_eq!(row["Age"], Value::from(34));
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, vec!["Name", "Age", "City"]);
    }

    #[test]
    fn test_column_aliases() {
        let table = Table::from_reader("Amount ($),Merchant\n12.5,Starbucks\n".as_bytes(), &[]).unwrap();
        let row = &table.rows()[0];
        assert_eq!(column_f64(row, &["Amount (USD)", "Amount ($)"]), Some(12.5));
        assert_eq!(column_str(row, &["Receiver", "Merchant"]), Some("Starbucks".to_string()));
        assert_eq!(column_str(row, &["Receiver"]), None);
    }

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number("-$855.94"), Some(-855.94));
        assert_eq!(parse_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_short_rows_are_null_filled() {
        let table = Table::from_reader("A,B\n1\n".as_bytes(), &[]).unwrap();
        assert_eq!(table.rows()[0]["B"], Value::Null);
    }
}
