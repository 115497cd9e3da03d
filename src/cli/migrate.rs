use anyhow::Result;

use crate::core::db::migrated_db;

pub async fn run(db_path: &str) -> Result<()> {
    println!("Migrating db at {}...", db_path);
    migrated_db(db_path).await?;
    println!("Finished migrating db");
    Ok(())
}
