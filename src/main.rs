mod categorizer;
mod cli;
mod db;
mod duplicates;
mod error;
mod fmt;
mod importer;
mod ledger;
mod models;
mod normalizer;
mod ofx;
mod reviewer;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::review::Format;
use cli::{AccountsCommands, Cli, Commands, RulesCommands};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let settings = settings::resolve(cli.data_dir.as_deref());

    let result = match cli.command {
        Commands::Init => cli::init::run(&settings),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                name,
                account_type,
                institution,
                balance,
            } => cli::accounts::add(&settings, &name, &account_type, institution.as_deref(), balance),
            AccountsCommands::List => cli::accounts::list(&settings),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                pattern,
                category,
                match_type,
                priority,
            } => cli::rules::add(&settings, &pattern, &category, &match_type, priority),
            RulesCommands::List => cli::rules::list(&settings),
        },
        Commands::Review {
            file,
            account,
            json,
            csv,
        } => {
            let format = if json {
                Format::Json
            } else if csv {
                Format::Csv
            } else {
                Format::Table
            };
            cli::review::run(&settings, &file, account, format)
        }
        Commands::Commit { request, json } => cli::commit::run(&settings, &request, json),
        Commands::Import {
            file,
            account,
            no_adjust_balance,
        } => cli::import::run(&settings, &file, account, no_adjust_balance),
        Commands::Status => cli::status::run(&settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
