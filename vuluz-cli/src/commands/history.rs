//! History commands - list, filter and export transactions

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use vuluz_core::domain::money::format_signed_idr;
use vuluz_core::domain::SortOrder;
use vuluz_core::services::export::export_csv;
use vuluz_core::{FilterPatch, TransactionType};

use super::{get_session, on_error, spinner};
use crate::output;

/// Filter flags of `vz history`
pub struct HistoryArgs {
    pub transaction_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
    pub csv: Option<PathBuf>,
}

fn parse_date(value: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .with_context(|| format!("Invalid --{} date '{}', expected YYYY-MM-DD", flag, v))
        })
        .transpose()
}

impl HistoryArgs {
    fn to_patch(&self) -> Result<FilterPatch> {
        let transaction_type = self
            .transaction_type
            .as_deref()
            .map(str::parse::<TransactionType>)
            .transpose()?;
        let sort = self.sort.as_deref().map(str::parse::<SortOrder>).transpose()?;

        Ok(FilterPatch::new()
            .transaction_type(transaction_type)
            .date_from(parse_date(self.from.as_deref(), "from")?)
            .date_to(parse_date(self.to.as_deref(), "to")?)
            .search(self.search.clone())
            .sort(sort))
    }
}

pub async fn list(args: HistoryArgs, json: bool) -> Result<()> {
    let patch = args.to_patch()?;
    let (ctx, _user) = get_session("history").await?;

    let bar = spinner("Loading transactions...", json);
    let loaded = ctx.wallet.load().await;
    bar.finish_and_clear();
    loaded.map_err(|e| on_error(&ctx, e))?;

    let mut transactions = ctx.wallet.apply_filters(patch)?;
    if let Some(limit) = args.limit {
        transactions.truncate(limit);
    }

    if let Some(path) = &args.csv {
        let written = export_csv(&transactions, path)?;
        if json {
            println!(
                "{}",
                serde_json::json!({ "exported": written, "path": path.to_string_lossy() })
            );
        } else {
            output::success(&format!("Exported {} transactions to {}", written, path.display()));
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        println!("No transactions match these filters.");
        return Ok(());
    }

    println!("{}", output::transaction_table(&transactions));
    let net: rust_decimal::Decimal = transactions
        .iter()
        .filter(|tx| !tx.is_failed())
        .map(|tx| tx.signed_amount())
        .sum();
    println!(
        "{} transactions, net {}",
        transactions.len(),
        format_signed_idr(net).bold()
    );
    Ok(())
}

pub async fn show(id: &str, json: bool) -> Result<()> {
    let (ctx, _user) = get_session("show").await?;

    let bar = spinner("Loading transactions...", json);
    let loaded = ctx.wallet.load().await;
    bar.finish_and_clear();
    loaded.map_err(|e| on_error(&ctx, e))?;

    let tx = ctx.wallet.get_transaction(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tx)?);
        return Ok(());
    }

    println!("{}", tx.description.bold());
    println!("  ID:           {}", tx.id);
    println!("  Date:         {}", tx.date.format("%Y-%m-%d %H:%M:%S"));
    println!("  Type:         {}", tx.transaction_type.label());
    println!("  Counterparty: {}", tx.counterparty);
    println!("  Amount:       {}", format_signed_idr(tx.signed_amount()));
    println!("  Status:       {}", tx.status.as_str());
    Ok(())
}
