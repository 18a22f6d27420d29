use std::path::Path;

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::importer;
use crate::models::{CommitTransaction, ImportBatch};
use crate::reviewer::{self, ReviewOptions};
use crate::settings::Settings;

/// Review then commit every selected candidate with its suggested category.
pub fn run(settings: &Settings, file: &str, account_id: i64, no_adjust_balance: bool) -> Result<()> {
    let path = Path::new(file);
    let mut conn = open_db(settings)?;
    let bytes = reviewer::read_upload(path, settings.max_upload_bytes)?;
    let review = reviewer::review(&conn, &bytes, account_id, &ReviewOptions::from(settings))?;

    let skipped_zero = review
        .transactions
        .iter()
        .filter(|t| t.selected && t.zero_amount)
        .count();
    let batch = ImportBatch {
        target_account_id: account_id,
        file_name: path.file_name().map(|n| n.to_string_lossy().to_string()),
        bank_id: Some(review.bank_id.clone()),
        bank_account_id: Some(review.bank_account_id.clone()),
        start_date: review.start_date,
        end_date: review.end_date,
        transactions: review
            .transactions
            .iter()
            .filter(|t| t.selected && !t.zero_amount)
            .map(CommitTransaction::from)
            .collect(),
        adjust_balance: !no_adjust_balance,
    };
    let receipt = importer::commit(&mut conn, &batch)?;

    println!(
        "{} imported, {} duplicates skipped, balance change {}",
        receipt.imported,
        receipt.duplicates_skipped + review.summary.duplicates,
        money(receipt.balance_change)
    );
    if skipped_zero > 0 {
        println!("{skipped_zero} zero-amount lines left out");
    }
    Ok(())
}
