//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use vuluz_core::adapters::memory::{DEMO_EMAIL, DEMO_PIN};
use vuluz_core::config::Config;

use super::get_vuluz_dir;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let vuluz_dir = get_vuluz_dir()?;
    std::fs::create_dir_all(&vuluz_dir)?;
    let mut config = Config::load(&vuluz_dir)?;

    match command {
        Some(DemoCommands::On) => {
            config.enable_demo_mode();
            config.save(&vuluz_dir)?;
            println!("{}", "Demo mode enabled".green());
            println!(
                "You are signed in as {} on an offline wallet. Use PIN {} for transfers.",
                DEMO_EMAIL, DEMO_PIN
            );
            Ok(())
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&vuluz_dir)?;
            println!("{}", "Demo mode disabled".yellow());
            println!("Run 'vz whoami' to check your session on {}.", config.api_base_url);
            Ok(())
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
            Ok(())
        }
    }
}
