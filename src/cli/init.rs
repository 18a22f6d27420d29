use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{save_settings, Settings};

pub fn run(settings: &Settings) -> Result<()> {
    save_settings(settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    println!("Initialized ledger at {}", resolved.display());
    Ok(())
}
