//! CLI command implementations

pub mod auth;
pub mod config;
pub mod demo;
pub mod favorites;
pub mod history;
pub mod logs;
pub mod transfer;
pub mod wallet;

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use vuluz_core::{EntryPoint, Error, LogEvent, LoggingService, OperationResult, User, VuluzContext};

use crate::output::Alert;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let vuluz_dir = get_vuluz_dir().ok()?;
    std::fs::create_dir_all(&vuluz_dir).ok()?;
    LoggingService::new(&vuluz_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the Vuluz directory from environment or default
pub fn get_vuluz_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("VULUZ_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".vuluz"))
        .ok_or_else(|| anyhow!("Could not find home directory. Set VULUZ_DIR instead."))
}

/// Get or create the Vuluz context
pub fn get_context() -> Result<VuluzContext> {
    let vuluz_dir = get_vuluz_dir()?;

    std::fs::create_dir_all(&vuluz_dir)
        .with_context(|| format!("Failed to create vuluz directory: {:?}", vuluz_dir))?;

    VuluzContext::new(&vuluz_dir).context("Failed to initialize vuluz context")
}

/// Context plus the restored user, for commands that need a session
///
/// An expired or rejected session is cleared before the error surfaces.
pub async fn get_session(command: &str) -> Result<(VuluzContext, User)> {
    let ctx = get_context()?;
    let logger = get_logger();

    match ctx.require_user().await {
        Ok(user) => {
            ctx.auth.touch()?;
            log_event(&logger, LogEvent::new("command_executed").with_command(command));
            Ok((ctx, user))
        }
        Err(Error::NotAuthenticated) => Err(Alert::new(
            "Session",
            "Not logged in. Run 'vz login' first.",
        )
        .into()),
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("session_invalid")
                    .with_command(command)
                    .with_error(e.to_string()),
            );
            Err(e.into())
        }
    }
}

/// Turn a failed operation into an alert, dropping the session on 401
pub fn check_outcome<T>(
    ctx: &VuluzContext,
    logger: &Option<LoggingService>,
    operation: &str,
    outcome: OperationResult<T>,
) -> Result<T> {
    let context = outcome.context.unwrap_or_default();
    let title = context
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Error")
        .to_string();

    match (outcome.success, outcome.data) {
        (true, Some(data)) => {
            log_event(
                logger,
                LogEvent::new(format!("{}_succeeded", operation)).with_operation(operation),
            );
            Ok(data)
        }
        _ => {
            let message = outcome
                .error
                .unwrap_or_else(|| "Something went wrong".to_string());
            log_event(
                logger,
                LogEvent::new(format!("{}_failed", operation))
                    .with_operation(operation)
                    .with_error(&message),
            );

            let auth_failure = context
                .get("authFailure")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if auth_failure {
                ctx.logout()?;
                return Err(Alert::new(
                    "Session",
                    "Your session has expired. Please log in again.",
                )
                .into());
            }

            Err(Alert::new(title, message).into())
        }
    }
}

/// Drop the session when a plain call failed with 401
pub fn on_error(ctx: &VuluzContext, err: Error) -> anyhow::Error {
    if err.is_auth_failure() {
        let _ = ctx.logout();
        return Alert::new("Session", "Your session has expired. Please log in again.").into();
    }
    err.into()
}

/// Read a secret from an env var, the terminal or piped stdin
pub fn read_secret(prompt: &str, env_var: &str) -> Result<String> {
    if let Ok(value) = std::env::var(env_var) {
        return Ok(value);
    }

    if atty::isnt(atty::Stream::Stdin) {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }

    Ok(dialoguer::Password::new().with_prompt(prompt).interact()?)
}

/// Spinner shown while waiting on the backend
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    bar
}
