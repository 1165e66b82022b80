//! Wallet commands - balance, summary, cashflow

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;
use vuluz_core::domain::money::{format_idr, format_signed_idr};
use vuluz_core::services::BalanceView;
use vuluz_core::CashflowPeriod;

use super::{get_session, on_error, spinner};
use crate::output;

pub async fn balance(json: bool) -> Result<()> {
    let (ctx, _user) = get_session("balance").await?;

    let bar = spinner("Loading wallet...", json);
    let state = ctx.wallet.load().await;
    bar.finish_and_clear();
    let view = BalanceView::from_state(&state.map_err(|e| on_error(&ctx, e))?);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}", "Balance".bold());
    println!("  {}", view.formatted_balance.bold());
    let change = format!("{} ({}%)", view.formatted_change, view.change_percent);
    if view.is_up() {
        println!("  {} vs last month", change.green());
    } else {
        println!("  {} vs last month", change.red());
    }
    println!("  Last month: {}", view.formatted_previous.dimmed());
    Ok(())
}

pub async fn summary(json: bool) -> Result<()> {
    let (ctx, _user) = get_session("summary").await?;

    let bar = spinner("Loading summary...", json);
    let state = ctx.wallet.load().await;
    bar.finish_and_clear();
    let state = state.map_err(|e| on_error(&ctx, e))?;
    let summary = state.summary.unwrap_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", "Summary".bold());
    println!("  Income:   {}", output::money(summary.total_income, true));
    println!("  Expense:  {}", output::money(summary.total_expense, false));
    println!("  Net:      {}", format_signed_idr(summary.net_income));
    println!("  Balance:  {}", format_idr(summary.current_balance));
    Ok(())
}

pub async fn cashflow(period: &str, json: bool) -> Result<()> {
    let period: CashflowPeriod = period.parse()?;
    let (ctx, _user) = get_session("cashflow").await?;

    let bar = spinner("Loading cashflow...", json);
    let points = ctx.wallet.cashflow(period).await;
    bar.finish_and_clear();
    let points = points.map_err(|e| on_error(&ctx, e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    if points.is_empty() {
        println!("No cashflow for this period.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Period", "Income", "Expense", "Net"]);
    for point in &points {
        table.add_row(vec![
            Cell::new(&point.label),
            Cell::new(format_idr(point.income)).fg(comfy_table::Color::Green),
            Cell::new(format_idr(point.expense)).fg(comfy_table::Color::Red),
            Cell::new(format_signed_idr(point.net)),
        ]);
    }
    println!("{}", table);
    Ok(())
}
