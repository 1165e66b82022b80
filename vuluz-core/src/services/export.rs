//! Export service - write transaction lists as CSV

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::Transaction;

const HEADER: [&str; 7] = [
    "id",
    "date",
    "type",
    "amount",
    "description",
    "counterparty",
    "status",
];

/// Write `transactions` as CSV to any writer
///
/// Amounts are signed: outgoing rows are negative.
pub fn write_csv<W: Write>(transactions: &[Transaction], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER)?;

    for tx in transactions {
        csv_writer.write_record([
            tx.id.as_str(),
            &tx.date.format("%Y-%m-%d %H:%M:%S").to_string(),
            tx.transaction_type.as_str(),
            &tx.signed_amount().to_string(),
            tx.description.as_str(),
            tx.counterparty.as_str(),
            tx.status.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write `transactions` to a CSV file, returning the row count
pub fn export_csv(transactions: &[Transaction], path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(transactions, file)?;
    Ok(transactions.len())
}
