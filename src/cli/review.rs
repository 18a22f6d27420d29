use std::collections::HashMap;
use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::ledger::get_category;
use crate::models::{Direction, ReviewResponse};
use crate::reviewer::{self, ReviewOptions};
use crate::settings::Settings;

pub enum Format {
    Table,
    Json,
    Csv,
}

pub fn run(settings: &Settings, file: &str, account_id: i64, format: Format) -> Result<()> {
    let conn = open_db(settings)?;
    let bytes = reviewer::read_upload(Path::new(file), settings.max_upload_bytes)?;
    let review = reviewer::review(&conn, &bytes, account_id, &ReviewOptions::from(settings))?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&review)?),
        Format::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for txn in &review.transactions {
                wtr.serialize(txn)?;
            }
            wtr.flush()?;
        }
        Format::Table => print_table(&conn, &review)?,
    }
    Ok(())
}

fn print_table(conn: &rusqlite::Connection, review: &ReviewResponse) -> Result<()> {
    let mut names: HashMap<i64, String> = HashMap::new();
    for id in review.transactions.iter().filter_map(|t| t.suggested_category_id) {
        if let std::collections::hash_map::Entry::Vacant(slot) = names.entry(id) {
            if let Some(cat) = get_category(conn, id)? {
                slot.insert(cat.name);
            }
        }
    }

    let mut table = Table::new();
    table.set_header(vec!["", "ID", "Date", "Description", "Amount", "Suggested"]);
    for txn in &review.transactions {
        let status = if txn.is_duplicate {
            "dup".dimmed().to_string()
        } else {
            "new".green().to_string()
        };
        let amount = money(txn.direction.signed(txn.amount));
        let amount = match txn.direction {
            Direction::Credit => amount.green().to_string(),
            Direction::Debit => amount.red().to_string(),
        };
        let category = txn
            .suggested_category_id
            .and_then(|id| names.get(&id).cloned())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(status),
            Cell::new(&txn.external_id),
            Cell::new(txn.date),
            Cell::new(&txn.description),
            Cell::new(amount),
            Cell::new(category),
        ]);
    }

    println!(
        "Statement {} / {} ({})",
        review.bank_id, review.bank_account_id, review.account_type
    );
    if let (Some(start), Some(end)) = (review.start_date, review.end_date) {
        println!("Period {start} to {end}");
    }
    println!("{table}");
    if let Some(balance) = review.balance {
        println!("Closing balance: {}", money(balance));
    }
    println!(
        "{} transactions: {} new, {} duplicates",
        review.summary.total, review.summary.new, review.summary.duplicates
    );
    Ok(())
}
