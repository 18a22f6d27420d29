use crate::cli::open_db;
use crate::error::Result;
use crate::settings::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let conn = open_db(settings)?;
    let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |r| r.get(0)) };

    let accounts = count("SELECT count(*) FROM accounts")?;
    let transactions = count("SELECT count(*) FROM transactions")?;
    let imports = count("SELECT count(*) FROM imports")?;
    let last_import: Option<String> =
        conn.query_row("SELECT max(import_date) FROM imports", [], |r| r.get(0))?;

    println!("Data directory: {}", settings.data_dir);
    println!("Database: {}", settings.db_path().display());
    println!("Accounts: {accounts}");
    println!("Transactions: {transactions}");
    println!("Imports: {imports}");
    if let Some(when) = last_import {
        println!("Last import: {when}");
    }
    Ok(())
}
