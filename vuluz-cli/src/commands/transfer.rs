//! Money commands - transfer and top-up
//!
//! Input is collected and checked up front, then confirmed, then the PIN is
//! asked for last so a mistyped amount never costs a PIN attempt.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};
use rust_decimal::Decimal;
use vuluz_core::domain::money::{format_idr, parse_amount};
use vuluz_core::domain::validation::validate_account_number;
use vuluz_core::services::{TopUpCommand, TransferCommand};
use vuluz_core::{PaymentMethod, Transaction};

use super::{check_outcome, get_logger, get_session, on_error, read_secret, spinner};
use crate::output::{self, Alert};

fn read_amount(value: Option<String>) -> Result<Decimal> {
    let raw = match value {
        Some(v) => v,
        None => Input::<String>::new().with_prompt("Amount").interact_text()?,
    };
    parse_amount(&raw)
        .ok_or_else(|| Alert::new("Invalid input", "Please enter a valid amount greater than zero").into())
}

/// Stop before the confirm and PIN prompts when the balance cannot cover it
fn ensure_funds(available: Decimal, amount: Decimal) -> Result<()> {
    if amount > available {
        return Err(Alert::new(
            "Insufficient balance",
            format!(
                "Your balance of {} does not cover {}",
                format_idr(available),
                format_idr(amount)
            ),
        )
        .into());
    }
    Ok(())
}

fn confirm(prompt: &str, skip: bool) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

fn print_receipt(title: &str, tx: &Transaction, balance: Decimal, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({ "transaction": tx, "balance": balance })
        );
        return Ok(());
    }
    output::success(title);
    println!("  {}  {}", tx.description, format_idr(tx.amount).bold());
    println!("  New balance: {}", format_idr(balance));
    Ok(())
}

pub async fn transfer(
    to: Option<String>,
    amount: Option<String>,
    notes: Option<String>,
    yes: bool,
    json: bool,
) -> Result<()> {
    let (ctx, user) = get_session("transfer").await?;
    let logger = get_logger();

    let to = match to {
        Some(v) => v,
        None => Input::<String>::new()
            .with_prompt("Recipient wallet number")
            .interact_text()?,
    };
    validate_account_number(&to)?;
    if user.owns_wallet(&to) {
        return Err(Alert::new("Invalid input", "You cannot transfer to your own wallet").into());
    }

    let bar = spinner("Looking up recipient...", json);
    let recipient = ctx.favorites.check(&to).await;
    bar.finish_and_clear();
    let recipient = recipient.map_err(|e| on_error(&ctx, e))?;

    let amount = read_amount(amount)?;
    ctx.config.transfer_limits.check(amount)?;
    ctx.wallet
        .load()
        .await
        .map_err(|e| on_error(&ctx, e))?;
    ensure_funds(ctx.wallet.balance()?, amount)?;

    let prompt = format!(
        "Send {} to {} ({})?",
        format_idr(amount),
        recipient.owner_name,
        recipient.wallet_number
    );
    if !confirm(&prompt, yes || json)? {
        println!("Cancelled.");
        return Ok(());
    }

    let pin = read_secret("PIN", "VULUZ_PIN")?;
    let mut command = TransferCommand::new(&recipient.wallet_number, amount, pin)
        .with_recipient_name(&recipient.owner_name);
    if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
        command = command.with_notes(notes);
    }

    let bar = spinner("Sending...", json);
    let outcome = ctx.wallet.create_transfer(command).await;
    bar.finish_and_clear();
    let tx = check_outcome(&ctx, &logger, "transfer", outcome)?;

    print_receipt("Transfer sent", &tx, ctx.wallet.balance()?, json)?;
    if !json && !recipient.is_favorite {
        println!(
            "  Tip: save this recipient with 'vz favorites add {}'",
            recipient.wallet_number
        );
    }
    Ok(())
}

fn read_method(value: Option<String>) -> Result<PaymentMethod> {
    if let Some(v) = value {
        return Ok(v.parse()?);
    }
    let labels: Vec<&str> = PaymentMethod::ALL.iter().map(|m| m.label()).collect();
    let choice = Select::new()
        .with_prompt("Payment method")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(PaymentMethod::ALL[choice])
}

pub async fn top_up(
    amount: Option<String>,
    method: Option<String>,
    description: Option<String>,
    yes: bool,
    json: bool,
) -> Result<()> {
    let (ctx, _user) = get_session("topup").await?;
    let logger = get_logger();

    let amount = read_amount(amount)?;
    ctx.config.top_up_limits.check(amount)?;
    let method = read_method(method)?;

    ctx.wallet
        .load()
        .await
        .map_err(|e| on_error(&ctx, e))?;

    let prompt = format!("Top up {} via {}?", format_idr(amount), method);
    if !confirm(&prompt, yes || json)? {
        println!("Cancelled.");
        return Ok(());
    }

    let pin = read_secret("PIN", "VULUZ_PIN")?;
    let mut command = TopUpCommand::new(amount, method, pin);
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        command = command.with_description(description);
    }

    let bar = spinner("Topping up...", json);
    let outcome = ctx.wallet.create_top_up(command).await;
    bar.finish_and_clear();
    let tx = check_outcome(&ctx, &logger, "top_up", outcome)?;

    print_receipt("Top-up complete", &tx, ctx.wallet.balance()?, json)
}
