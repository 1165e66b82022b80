//! Auth commands - login, register, logout, whoami

use anyhow::Result;
use colored::Colorize;
use dialoguer::Input;
use vuluz_core::domain::money::format_idr;
use vuluz_core::{Credentials, LogEvent, Registration};

use super::{get_context, get_logger, get_session, log_event, read_secret, spinner};
use crate::output;

fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

pub async fn login(email: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let email = prompt_if_missing(email, "Email")?;
    let password = read_secret("Password", "VULUZ_PASSWORD")?;

    let bar = spinner("Logging in...", json);
    let result = ctx.login(&Credentials::new(email, password)).await;
    bar.finish_and_clear();

    match result {
        Ok(user) => {
            log_event(&logger, LogEvent::new("login_succeeded").with_operation("login"));
            if json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                output::success(&format!("Welcome back, {}!", user.full_name));
                if ctx.is_demo() {
                    output::info("Demo mode is on. Nothing leaves this machine.");
                }
            }
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("login_failed")
                    .with_operation("login")
                    .with_error(e.to_string()),
            );
            Err(e.into())
        }
    }
}

pub async fn register(
    name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let form = Registration {
        full_name: prompt_if_missing(name, "Full name")?,
        user_name: prompt_if_missing(username, "Username")?,
        email: prompt_if_missing(email, "Email")?,
        password: read_secret("Password", "VULUZ_PASSWORD")?,
        pin: read_secret("PIN (6 digits)", "VULUZ_PIN")?,
        gender: None,
    };

    let bar = spinner("Creating account...", json);
    let result = ctx.auth.register(&form).await;
    bar.finish_and_clear();

    match result {
        Ok(message) => {
            log_event(&logger, LogEvent::new("register_succeeded").with_operation("register"));
            if json {
                println!("{}", serde_json::json!({ "message": message }));
            } else {
                output::success(&message);
                println!("Run 'vz login' to sign in.");
            }
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("register_failed")
                    .with_operation("register")
                    .with_error(e.to_string()),
            );
            Err(e.into())
        }
    }
}

pub fn logout() -> Result<()> {
    let ctx = get_context()?;
    ctx.logout()?;
    log_event(&get_logger(), LogEvent::new("logout").with_operation("logout"));
    output::success("Logged out");
    Ok(())
}

pub async fn whoami(json: bool) -> Result<()> {
    let (_ctx, user) = get_session("whoami").await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    println!("{}", user.full_name.bold());
    println!("  Email:   {}", user.email);
    if let Some(username) = &user.user_name {
        println!("  User:    {}", username);
    }
    if let Some(wallet) = &user.wallet_number {
        println!("  Wallet:  {}", wallet);
    }
    println!("  Balance: {}", format_idr(user.balance));
    Ok(())
}
