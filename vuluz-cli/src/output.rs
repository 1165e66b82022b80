//! Output formatting utilities

use std::fmt;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use rust_decimal::Decimal;
use vuluz_core::domain::money::{format_idr, format_signed_idr};
use vuluz_core::{Transaction, TransactionStatus};

/// User-facing failure: a short title plus the message under it
#[derive(Debug)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

impl std::error::Error for Alert {}

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Print an alert: red bold title, message underneath
pub fn alert(title: &str, message: &str) {
    eprintln!("{}", title.red().bold());
    eprintln!("  {}", message);
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn amount_cell(tx: &Transaction) -> Cell {
    let color = if tx.transaction_type.is_incoming() {
        Color::Green
    } else {
        Color::Red
    };
    Cell::new(format_signed_idr(tx.signed_amount())).fg(color)
}

pub fn status_cell(status: TransactionStatus) -> Cell {
    let color = match status {
        TransactionStatus::Completed => Color::Green,
        TransactionStatus::Pending => Color::Yellow,
        TransactionStatus::Failed => Color::Red,
    };
    Cell::new(status.as_str()).fg(color)
}

/// Table of transactions, newest first as given
pub fn transaction_table(transactions: &[Transaction]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Date", "Type", "Description", "Counterparty", "Amount", "Status"]);
    for tx in transactions {
        table.add_row(vec![
            Cell::new(tx.date.format("%Y-%m-%d %H:%M")),
            Cell::new(tx.transaction_type.label()),
            Cell::new(&tx.description),
            Cell::new(&tx.counterparty),
            amount_cell(tx),
            status_cell(tx.status),
        ]);
    }
    table
}

/// Money with the income/expense color applied
pub fn money(amount: Decimal, incoming: bool) -> String {
    let text = format_idr(amount);
    if incoming {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}
