//! Config command - view and change settings

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use vuluz_core::config::Config;
use vuluz_core::domain::money::format_idr;

use super::get_vuluz_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Point the client at another backend
    SetApi {
        /// Base URL, e.g. https://api.vuluz.app
        url: String,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let vuluz_dir = get_vuluz_dir()?;
    std::fs::create_dir_all(&vuluz_dir)?;
    let mut config = Config::load(&vuluz_dir)?;

    match command {
        ConfigCommands::Show { json } => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "apiBaseUrl": config.api_base_url,
                        "currency": config.currency,
                        "requestTimeoutSecs": config.request_timeout.as_secs(),
                        "idleTimeoutMins": config.idle_timeout_mins,
                        "transferLimits": config.transfer_limits,
                        "topUpLimits": config.top_up_limits,
                        "demoMode": config.demo_mode,
                        "directory": vuluz_dir.to_string_lossy(),
                    })
                );
                return Ok(());
            }

            println!("{}", "Settings".bold());
            println!("  API:          {}", config.api_base_url);
            println!("  Currency:     {}", config.currency);
            println!("  Timeout:      {}s", config.request_timeout.as_secs());
            println!("  Idle logout:  {} min", config.idle_timeout_mins);
            println!(
                "  Transfer:     {} to {}",
                format_idr(config.transfer_limits.min),
                format_idr(config.transfer_limits.max)
            );
            println!(
                "  Top-up:       {} to {}",
                format_idr(config.top_up_limits.min),
                format_idr(config.top_up_limits.max)
            );
            let demo = if config.demo_mode { "ON".green() } else { "OFF".yellow() };
            println!("  Demo mode:    {}", demo);
            println!("  Directory:    {}", vuluz_dir.display());
        }
        ConfigCommands::SetApi { url } => {
            config.set_api_base_url(&url)?;
            config.save(&vuluz_dir)?;
            output::success(&format!("API base URL set to {}", config.api_base_url));
            if config.demo_mode {
                output::warning("Demo mode is on. The new URL is used once it is turned off.");
            } else {
                output::info("Run 'vz login' to sign in against the new backend.");
            }
        }
    }

    Ok(())
}
