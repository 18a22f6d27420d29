use std::collections::HashSet;

use rusqlite::Connection;

use crate::models::TransactionCandidate;

/// Exact set-membership test against previously committed external ids.
pub fn is_imported(conn: &Connection, account_id: i64, external_id: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM imported_external_ids WHERE account_id = ?1 AND external_id = ?2",
    )?;
    stmt.exists(rusqlite::params![account_id, external_id])
}

/// Flags candidates whose external id is already known for the account.
///
/// A repeated id within the same file is flagged on its second and later
/// occurrences. No date/amount/description matching is done.
pub fn resolve(
    conn: &Connection,
    account_id: i64,
    candidates: &mut [TransactionCandidate],
) -> rusqlite::Result<()> {
    let mut seen = HashSet::new();
    for candidate in candidates.iter_mut() {
        let repeated = !seen.insert(candidate.external_id.clone());
        let duplicate = repeated || is_imported(conn, account_id, &candidate.external_id)?;
        candidate.is_duplicate = duplicate;
        candidate.selected = !duplicate;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::models::Direction;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn candidate(id: &str) -> TransactionCandidate {
        TransactionCandidate {
            external_id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            amount: Decimal::new(450, 2),
            direction: Direction::Debit,
            description: "Coffee".to_string(),
            is_duplicate: false,
            selected: true,
            suggested_category_id: None,
            zero_amount: false,
        }
    }

    fn mark_imported(conn: &Connection, account_id: i64, external_id: &str) {
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, amount, direction, external_id) \
             VALUES (?1, '2024-01-01', 'x', '1', 'debit', ?2)",
            rusqlite::params![account_id, external_id],
        ).unwrap();
        let txn_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO imported_external_ids (account_id, external_id, transaction_id) VALUES (?1, ?2, ?3)",
            rusqlite::params![account_id, external_id, txn_id],
        ).unwrap();
    }

    fn add_account(conn: &Connection, name: &str) -> i64 {
        conn.execute(
            "INSERT INTO accounts (name, account_type) VALUES (?1, 'checking')", [name],
        ).unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_known_id_is_duplicate() {
        let (_dir, conn) = test_db();
        let acct = add_account(&conn, "Checking");
        mark_imported(&conn, acct, "A1");
        let mut cands = vec![candidate("A1"), candidate("A2")];
        resolve(&conn, acct, &mut cands).unwrap();
        assert!(cands[0].is_duplicate);
        assert!(!cands[0].selected);
        assert!(!cands[1].is_duplicate);
        assert!(cands[1].selected);
    }

    #[test]
    fn test_identical_entries_with_distinct_ids_are_both_new() {
        let (_dir, conn) = test_db();
        let acct = add_account(&conn, "Checking");
        let mut cands = vec![candidate("C1"), candidate("C2")];
        resolve(&conn, acct, &mut cands).unwrap();
        assert!(cands.iter().all(|c| !c.is_duplicate && c.selected));
    }

    #[test]
    fn test_ids_are_scoped_per_account() {
        let (_dir, conn) = test_db();
        let checking = add_account(&conn, "Checking");
        let savings = add_account(&conn, "Savings");
        mark_imported(&conn, checking, "A1");
        let mut cands = vec![candidate("A1")];
        resolve(&conn, savings, &mut cands).unwrap();
        assert!(!cands[0].is_duplicate);
    }

    #[test]
    fn test_repeated_id_within_file() {
        let (_dir, conn) = test_db();
        let acct = add_account(&conn, "Checking");
        let mut cands = vec![candidate("R1"), candidate("R1")];
        resolve(&conn, acct, &mut cands).unwrap();
        assert!(!cands[0].is_duplicate);
        assert!(cands[1].is_duplicate);
    }
}
