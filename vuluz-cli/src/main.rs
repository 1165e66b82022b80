//! Vuluz CLI - your digital wallet in the terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{auth, config, demo, favorites, history, logs, transfer, wallet};

/// Vuluz - send, top up and track your wallet from the terminal
#[derive(Parser)]
#[command(name = "vz", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to your wallet
    Login {
        /// Account email
        #[arg(long, short)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new account
    Register {
        /// Full name
        #[arg(long)]
        name: Option<String>,
        /// Username
        #[arg(long)]
        username: Option<String>,
        /// Account email
        #[arg(long, short)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log out and forget the session
    Logout,

    /// Show the logged-in profile
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show balance and change against last month
    Balance {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show income and expense totals
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show income and expense per period
    Cashflow {
        /// Period: daily, weekly, monthly or quarterly
        #[arg(default_value = "monthly")]
        period: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transactions
    History {
        /// Transaction type (TRANSFER_IN, TRANSFER_OUT, TOP_UP, PAYMENT, REFUND)
        #[arg(long = "type", short = 't')]
        transaction_type: Option<String>,
        /// Earliest date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Match description or counterparty
        #[arg(long, short)]
        search: Option<String>,
        /// Sort order: amount_asc, amount_desc, date_asc, date_desc
        #[arg(long)]
        sort: Option<String>,
        /// Maximum rows to show
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        /// Write the listed transactions to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one transaction
    Show {
        /// Transaction ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send money to another wallet
    Transfer {
        /// Recipient wallet number
        #[arg(long)]
        to: Option<String>,
        /// Amount, e.g. 50000 or 50.000
        #[arg(long, short)]
        amount: Option<String>,
        /// Note for the recipient
        #[arg(long)]
        notes: Option<String>,
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add money to your wallet
    Topup {
        /// Amount, e.g. 100000
        #[arg(long, short)]
        amount: Option<String>,
        /// Payment method: credit, debit, bank or paypal
        #[arg(long, short)]
        method: Option<String>,
        /// Description shown in history
        #[arg(long)]
        description: Option<String>,
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage favorite recipients
    Favorites {
        #[command(subcommand)]
        command: favorites::FavoritesCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// View and change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(alert) = e.downcast_ref::<output::Alert>() {
                output::alert(&alert.title, &alert.message);
            } else if let Some(err) = e.downcast_ref::<vuluz_core::Error>() {
                output::alert(err.title(), &err.to_string());
            } else {
                output::alert("Error", &format!("{:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { email, json } => auth::login(email, json).await,
        Commands::Register { name, username, email, json } => {
            auth::register(name, username, email, json).await
        }
        Commands::Logout => auth::logout(),
        Commands::Whoami { json } => auth::whoami(json).await,
        Commands::Balance { json } => wallet::balance(json).await,
        Commands::Summary { json } => wallet::summary(json).await,
        Commands::Cashflow { period, json } => wallet::cashflow(&period, json).await,
        Commands::History { transaction_type, from, to, search, sort, limit, csv, json } => {
            let args = history::HistoryArgs {
                transaction_type,
                from,
                to,
                search,
                sort,
                limit,
                csv,
            };
            history::list(args, json).await
        }
        Commands::Show { id, json } => history::show(&id, json).await,
        Commands::Transfer { to, amount, notes, yes, json } => {
            transfer::transfer(to, amount, notes, yes, json).await
        }
        Commands::Topup { amount, method, description, yes, json } => {
            transfer::top_up(amount, method, description, yes, json).await
        }
        Commands::Favorites { command } => favorites::run(command).await,
        Commands::Logs { command } => logs::run(command),
        Commands::Config { command } => config::run(command),
        Commands::Demo { command } => demo::run(command),
    }
}
