//! sqlite connection helpers and schema

use anyhow::{Error, Result};
use tokio_rusqlite::Connection;

/// Open (or create) the sqlite database at `db_path`.
pub async fn async_db(db_path: &str) -> Result<Connection, Error> {
    let db = Connection::open(db_path).await?;
    Ok(db)
}

/// Create the schema if it does not exist yet. Safe to run on every
/// start.
pub fn initialize_db(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS chat_message (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_chat_message_conversation
            ON chat_message (conversation_id, id);
        "#,
    )
}

/// Open the database and make sure the schema is in place
pub async fn migrated_db(db_path: &str) -> Result<Connection, Error> {
    let db = async_db(db_path).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    Ok(db)
}
