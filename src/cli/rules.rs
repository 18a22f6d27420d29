use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::{ImportError, Result};
use crate::ledger::find_category_by_name;
use crate::settings::Settings;

const MATCH_TYPES: &[&str] = &["contains", "starts_with", "regex"];

pub fn add(
    settings: &Settings,
    pattern: &str,
    category: &str,
    match_type: &str,
    priority: i64,
) -> Result<()> {
    if !MATCH_TYPES.contains(&match_type) {
        return Err(ImportError::Settings(format!(
            "unknown match type '{match_type}' (expected one of: {})",
            MATCH_TYPES.join(", ")
        )));
    }
    if match_type == "regex" {
        regex::Regex::new(pattern)
            .map_err(|e| ImportError::Settings(format!("invalid regex: {e}")))?;
    }
    let conn = open_db(settings)?;
    let cat = find_category_by_name(&conn, category)?;

    conn.execute(
        "INSERT INTO rules (pattern, match_type, category_id, priority) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![pattern, match_type, cat.id, priority],
    )?;
    println!("Added rule: '{pattern}' \u{2192} {} ({})", cat.name, cat.category_type);
    Ok(())
}

pub fn list(settings: &Settings) -> Result<()> {
    let conn = open_db(settings)?;
    let mut stmt = conn.prepare(
        "SELECT r.id, r.pattern, r.match_type, c.name as category, r.priority \
         FROM rules r JOIN categories c ON r.category_id = c.id \
         WHERE r.is_active = 1 ORDER BY r.priority DESC",
    )?;
    let rows: Vec<(i64, String, String, String, i64)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Pattern", "Type", "Category", "Priority"]);
    for (id, pattern, match_type, category, priority) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(pattern),
            Cell::new(match_type),
            Cell::new(category),
            Cell::new(priority),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}
