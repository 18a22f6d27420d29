//! Account and category access used by the import engine.

use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::db::decimal_column;
use crate::error::{ImportError, Result};
use crate::models::{Account, Category};

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        account_type: row.get(2)?,
        institution: row.get(3)?,
        balance: decimal_column(row, 4)?,
    })
}

pub fn add_account(
    conn: &Connection,
    name: &str,
    account_type: &str,
    institution: Option<&str>,
    balance: Decimal,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (name, account_type, institution, balance) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, account_type, institution, balance.to_string()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_account(conn: &Connection, account_id: i64) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        "SELECT id, name, account_type, institution, balance FROM accounts WHERE id = ?1",
        [account_id],
        account_from_row,
    )
    .optional()
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, account_type, institution, balance FROM accounts ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], account_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Current balance, or `None` when the account does not exist.
pub fn account_balance(conn: &Connection, account_id: i64) -> rusqlite::Result<Option<Decimal>> {
    conn.query_row(
        "SELECT balance FROM accounts WHERE id = ?1",
        [account_id],
        |row| decimal_column(row, 0),
    )
    .optional()
}

pub fn set_account_balance(conn: &Connection, account_id: i64, balance: Decimal) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE accounts SET balance = ?1 WHERE id = ?2",
        rusqlite::params![balance.to_string(), account_id],
    )?;
    Ok(())
}

pub fn get_category(conn: &Connection, category_id: i64) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        "SELECT id, name, category_type FROM categories WHERE id = ?1",
        [category_id],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                category_type: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn find_category_by_name(conn: &Connection, name: &str) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, category_type FROM categories WHERE name = ?1 AND is_active = 1",
        [name],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                category_type: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| ImportError::UnknownCategory(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[test]
    fn test_add_and_get_account() {
        let (_dir, conn) = test_db();
        let id = add_account(&conn, "Checking", "checking", Some("First Bank"), Decimal::new(12050, 2)).unwrap();
        let acct = get_account(&conn, id).unwrap().unwrap();
        assert_eq!(acct.name, "Checking");
        assert_eq!(acct.institution.as_deref(), Some("First Bank"));
        assert_eq!(acct.balance, Decimal::new(12050, 2));
        assert!(get_account(&conn, id + 1).unwrap().is_none());
    }

    #[test]
    fn test_balance_roundtrip_is_exact() {
        let (_dir, conn) = test_db();
        let id = add_account(&conn, "Savings", "savings", None, Decimal::ZERO).unwrap();
        set_account_balance(&conn, id, Decimal::new(1, 2) + Decimal::new(2, 1)).unwrap();
        assert_eq!(account_balance(&conn, id).unwrap(), Some(Decimal::new(21, 2)));
        assert_eq!(account_balance(&conn, 999).unwrap(), None);
    }

    #[test]
    fn test_find_category_by_name() {
        let (_dir, conn) = test_db();
        let cat = find_category_by_name(&conn, "Groceries").unwrap();
        assert_eq!(cat.category_type, "expense");
        assert_eq!(get_category(&conn, cat.id).unwrap().unwrap().name, "Groceries");
        assert!(matches!(
            find_category_by_name(&conn, "Yachts"),
            Err(ImportError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_list_accounts() {
        let (_dir, conn) = test_db();
        add_account(&conn, "A", "checking", None, Decimal::ZERO).unwrap();
        add_account(&conn, "B", "credit_card", None, Decimal::ZERO).unwrap();
        let names: Vec<String> = list_accounts(&conn).unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
