//! Import commit pipeline.
//!
//! `Validated -> Reserved -> Written -> Finalized`, or `Aborted` from any
//! non-terminal stage. Everything from Reserved on happens inside one
//! `IMMEDIATE` SQLite transaction, which holds the writer lock until commit,
//! so a failure anywhere leaves no rows and no balance change behind.

use std::collections::HashSet;

use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::duplicates::is_imported;
use crate::error::CommitError;
use crate::ledger::{account_balance, get_account, get_category, set_account_balance};
use crate::models::{CommitTransaction, ImportBatch, ImportReceipt};
use crate::normalizer::synthesize_external_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    Validated,
    Reserved,
    Written,
    Finalized,
    Aborted,
}

struct Staged<'a> {
    external_id: String,
    txn: &'a CommitTransaction,
    signed_amount: Decimal,
}

struct Validated<'a> {
    staged: Vec<Staged<'a>>,
    /// Duplicates the caller echoed back unselected from review.
    skipped: usize,
}

fn validate<'a>(conn: &Connection, batch: &'a ImportBatch) -> Result<Validated<'a>, CommitError> {
    if get_account(conn, batch.target_account_id)?.is_none() {
        return Err(CommitError::UnknownAccount(batch.target_account_id));
    }

    let mut staged = Vec::new();
    let mut skipped = 0usize;
    let mut seen = HashSet::new();
    for txn in &batch.transactions {
        if !txn.selected {
            if txn.is_duplicate {
                skipped += 1;
            }
            continue;
        }
        let external_id = match txn.external_id.trim() {
            "" => synthesize_external_id(txn.date, txn.direction.signed(txn.amount), txn.description.trim()),
            id => id.to_string(),
        };
        if txn.is_duplicate || !seen.insert(external_id.clone()) {
            return Err(CommitError::DuplicateSelected(external_id));
        }
        if txn.amount <= Decimal::ZERO {
            return Err(CommitError::NonPositiveAmount(external_id));
        }
        if let Some(category_id) = txn.category_id {
            if get_category(conn, category_id)?.is_none() {
                return Err(CommitError::UnknownCategory(category_id));
            }
        }
        staged.push(Staged {
            signed_amount: txn.direction.signed(txn.amount),
            external_id,
            txn,
        });
    }
    Ok(Validated { staged, skipped })
}

/// Zero at cent scale, so an empty receipt reads `0.00`.
fn no_change() -> Decimal {
    Decimal::new(0, 2)
}

fn write(conn: &mut Connection, batch: &ImportBatch, validated: Validated<'_>) -> Result<ImportReceipt, CommitError> {
    let account_id = batch.target_account_id;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    debug!(account_id, stage = ?CommitStage::Reserved, "commit scope reserved");

    // Authoritative re-checks now that the writer lock is held.
    let balance = account_balance(&tx, account_id)?.ok_or(CommitError::UnknownAccount(account_id))?;
    let mut skipped = validated.skipped;
    let mut fresh = Vec::with_capacity(validated.staged.len());
    for staged in validated.staged {
        if is_imported(&tx, account_id, &staged.external_id)? {
            skipped += 1;
        } else {
            fresh.push(staged);
        }
    }

    let mut net = no_change();
    if !fresh.is_empty() {
        tx.execute(
            "INSERT INTO imports (filename, account_id, bank_id, bank_account_id, record_count, date_range_start, date_range_end) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                batch.file_name,
                account_id,
                batch.bank_id,
                batch.bank_account_id,
                fresh.len() as i64,
                batch.start_date.map(|d| d.to_string()),
                batch.end_date.map(|d| d.to_string()),
            ],
        )?;
        let import_id = tx.last_insert_rowid();

        let mut insert_txn = tx.prepare_cached(
            "INSERT INTO transactions (account_id, date, description, amount, direction, category_id, external_id, import_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        let mut insert_seen = tx.prepare_cached(
            "INSERT INTO imported_external_ids (account_id, external_id, transaction_id) VALUES (?1, ?2, ?3)",
        )?;
        for staged in &fresh {
            let txn_id = insert_txn.insert(rusqlite::params![
                account_id,
                staged.txn.date.to_string(),
                staged.txn.description.trim(),
                staged.txn.amount.to_string(),
                staged.txn.direction.as_str(),
                staged.txn.category_id,
                staged.external_id,
                import_id,
            ])?;
            insert_seen.execute(rusqlite::params![account_id, staged.external_id, txn_id])?;
            if batch.adjust_balance {
                net = net
                    .checked_add(staged.signed_amount)
                    .ok_or_else(|| CommitError::AmountOverflow(staged.external_id.clone()))?;
            }
        }
    }
    debug!(account_id, stage = ?CommitStage::Written, rows = fresh.len(), "transactions written");

    let balance_change = net;
    if !balance_change.is_zero() {
        let updated = balance
            .checked_add(balance_change)
            .ok_or(CommitError::BalanceOverflow(account_id))?;
        set_account_balance(&tx, account_id, updated)?;
    }
    tx.commit()?;

    Ok(ImportReceipt {
        imported: fresh.len(),
        duplicates_skipped: skipped,
        balance_change,
    })
}

/// Commits an approved batch as one atomic unit.
///
/// Re-submitting the same batch is safe: ids committed by the first attempt
/// are counted as skipped duplicates and nothing is applied twice.
pub fn commit(conn: &mut Connection, batch: &ImportBatch) -> Result<ImportReceipt, CommitError> {
    let account_id = batch.target_account_id;
    let result = validate(conn, batch).and_then(|validated| {
        debug!(account_id, stage = ?CommitStage::Validated, rows = validated.staged.len(), "batch validated");
        write(conn, batch, validated)
    });
    match &result {
        Ok(receipt) => info!(
            account_id,
            stage = ?CommitStage::Finalized,
            imported = receipt.imported,
            duplicates_skipped = receipt.duplicates_skipped,
            balance_change = %receipt.balance_change,
            "import committed"
        ),
        Err(e) => warn!(account_id, stage = ?CommitStage::Aborted, error = %e, "import aborted"),
    }
    result
}
