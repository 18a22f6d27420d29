use std::io::Read;

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::importer;
use crate::models::ImportBatch;
use crate::settings::Settings;

fn read_request(request: &str) -> Result<String> {
    if request == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(request)?)
    }
}

pub fn run(settings: &Settings, request: &str, json: bool) -> Result<()> {
    let batch: ImportBatch = serde_json::from_str(&read_request(request)?)?;
    let mut conn = open_db(settings)?;
    let receipt = importer::commit(&mut conn, &batch).inspect_err(|e| {
        if e.is_retryable() {
            eprintln!("Nothing was written. The same request can be resubmitted.");
        }
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    } else {
        println!(
            "{} imported, {} duplicates skipped, balance change {}",
            receipt.imported,
            receipt.duplicates_skipped,
            money(receipt.balance_change)
        );
    }
    Ok(())
}
