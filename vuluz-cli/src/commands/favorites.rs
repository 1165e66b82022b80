//! Favorites command - manage saved recipients

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use vuluz_core::LogEvent;

use super::{get_logger, get_session, log_event, on_error, spinner};
use crate::output;

#[derive(Subcommand)]
pub enum FavoritesCommands {
    /// List saved recipients
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a recipient by wallet number
    Add {
        /// Wallet number to save
        wallet_number: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a saved recipient
    Remove {
        /// Wallet number to remove
        wallet_number: String,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up who owns a wallet number
    Check {
        /// Wallet number to look up
        wallet_number: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: FavoritesCommands) -> Result<()> {
    let (ctx, _user) = get_session("favorites").await?;
    let logger = get_logger();

    match command {
        FavoritesCommands::List { json } => {
            let bar = spinner("Loading favorites...", json);
            let favorites = ctx.favorites.list().await;
            bar.finish_and_clear();
            let favorites = favorites.map_err(|e| on_error(&ctx, e))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&favorites)?);
                return Ok(());
            }
            if favorites.is_empty() {
                println!("No favorites yet. Add one with 'vz favorites add <wallet>'.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Name", "Wallet", "Label"]);
            for fav in &favorites {
                table.add_row(vec![
                    fav.owner_name.clone(),
                    fav.wallet_number.clone(),
                    fav.wallet_name.clone().unwrap_or_default(),
                ]);
            }
            println!("{}", table);
        }
        FavoritesCommands::Add { wallet_number, json } => {
            let bar = spinner("Saving favorite...", json);
            let favorite = ctx.favorites.add(&wallet_number).await;
            bar.finish_and_clear();
            let favorite = favorite.map_err(|e| on_error(&ctx, e))?;
            log_event(&logger, LogEvent::new("favorite_added").with_operation("add_favorite"));

            if json {
                println!("{}", serde_json::to_string_pretty(&favorite)?);
            } else {
                output::success(&format!(
                    "Saved {} ({})",
                    favorite.owner_name, favorite.wallet_number
                ));
            }
        }
        FavoritesCommands::Remove { wallet_number, force, json } => {
            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Remove {} from favorites?", wallet_number))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            ctx.favorites
                .remove(&wallet_number)
                .await
                .map_err(|e| on_error(&ctx, e))?;
            log_event(
                &logger,
                LogEvent::new("favorite_removed").with_operation("remove_favorite"),
            );

            if json {
                println!("{}", serde_json::json!({ "removed": wallet_number }));
            } else {
                output::success(&format!("Removed {}", wallet_number));
            }
        }
        FavoritesCommands::Check { wallet_number, json } => {
            let bar = spinner("Looking up wallet...", json);
            let check = ctx.favorites.check(&wallet_number).await;
            bar.finish_and_clear();
            let check = check.map_err(|e| on_error(&ctx, e))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&check)?);
            } else {
                let star = if check.is_favorite {
                    " ★".yellow().to_string()
                } else {
                    String::new()
                };
                println!("{}{}", check.owner_name.bold(), star);
                println!("  Wallet: {}", check.wallet_number);
            }
        }
    }

    Ok(())
}
