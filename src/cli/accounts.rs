use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::ledger;
use crate::settings::Settings;

pub fn add(
    settings: &Settings,
    name: &str,
    account_type: &str,
    institution: Option<&str>,
    balance: Decimal,
) -> Result<()> {
    let conn = open_db(settings)?;
    let id = ledger::add_account(&conn, name, account_type, institution, balance)?;
    println!("Added account {id}: {name}");
    Ok(())
}

pub fn list(settings: &Settings) -> Result<()> {
    let conn = open_db(settings)?;
    let accounts = ledger::list_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Institution", "Balance"]);
    for acct in accounts {
        table.add_row(vec![
            Cell::new(acct.id),
            Cell::new(acct.name),
            Cell::new(acct.account_type),
            Cell::new(acct.institution.unwrap_or_default()),
            Cell::new(money(acct.balance)),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
