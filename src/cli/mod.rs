pub mod accounts;
pub mod commit;
pub mod import;
pub mod init;
pub mod review;
pub mod rules;
pub mod status;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::get_connection;
use crate::error::{ImportError, Result};
use crate::settings::Settings;

/// Opens the configured database, refusing to create one implicitly.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    let path = settings.db_path();
    if !path.exists() {
        return Err(ImportError::NotInitialized(path.display().to_string()));
    }
    get_connection(&path)
}

#[derive(Parser)]
#[command(
    name = "ledger-import",
    about = "Import bank statements into your ledger: review, deduplicate, commit."
)]
pub struct Cli {
    /// Data directory for this invocation (overrides settings)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, settings file and database.
    Init,
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage categorization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Parse a statement and show what an import would do. Writes nothing.
    Review {
        /// Path to an OFX/QFX statement
        file: String,
        /// Target account ID
        #[arg(long)]
        account: i64,
        /// Print the review as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        /// Print the candidates as CSV
        #[arg(long)]
        csv: bool,
    },
    /// Commit a reviewed selection from a JSON commit request ("-" for stdin).
    Commit {
        /// Path to the commit request JSON
        request: String,
        /// Print the receipt as JSON
        #[arg(long)]
        json: bool,
    },
    /// Review a statement and commit every selected transaction in one step.
    Import {
        /// Path to an OFX/QFX statement
        file: String,
        /// Target account ID
        #[arg(long)]
        account: i64,
        /// Record the transactions without touching the account balance
        #[arg(long = "no-adjust-balance")]
        no_adjust_balance: bool,
    },
    /// Show the current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name, e.g. 'Everyday Checking'
        name: String,
        /// Account type: checking, savings, credit_card
        #[arg(long = "type")]
        account_type: String,
        /// Institution name
        #[arg(long)]
        institution: Option<String>,
        /// Opening balance
        #[arg(long, default_value = "0")]
        balance: Decimal,
    },
    /// List all accounts.
    List,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a categorization rule.
    Add {
        /// Pattern to match against transaction descriptions
        pattern: String,
        /// Category name to assign
        #[arg(long)]
        category: String,
        /// Match type: contains, starts_with, regex
        #[arg(long = "match-type", default_value = "contains")]
        match_type: String,
        /// Rule priority (higher wins)
        #[arg(long, default_value = "0")]
        priority: i64,
    },
    /// List all categorization rules.
    List,
}
