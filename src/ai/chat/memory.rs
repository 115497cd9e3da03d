//! Sliding window of recent messages per conversation, persisted in
//! sqlite so context survives restarts.

use anyhow::{Error, Result};
use serde_json::json;
use tokio_rusqlite::Connection;

use crate::openai::Message;

/// Number of messages kept per conversation
pub const MEMORY_WINDOW: usize = 10;

#[derive(Clone)]
pub struct ChatMemory {
    db: Connection,
    window: usize,
}

impl ChatMemory {
    pub fn new(db: Connection) -> Self {
        Self {
            db,
            window: MEMORY_WINDOW,
        }
    }

    pub async fn add(&self, conversation_id: &str, msg: &Message) -> Result<(), Error> {
        self.add_many(conversation_id, std::slice::from_ref(msg))
            .await
    }

    /// Append messages in order and drop everything older than the
    /// window. Either all of them are stored or none are.
    pub async fn add_many(&self, conversation_id: &str, msgs: &[Message]) -> Result<(), Error> {
        let id = conversation_id.to_owned();
        let data = msgs
            .iter()
            .map(|msg| json!(msg).to_string())
            .collect::<Vec<_>>();
        let window = self.window as i64;

        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                for row in data.iter() {
                    tx.execute(
                        "INSERT INTO chat_message (conversation_id, data) VALUES (?, ?)",
                        [&id, row],
                    )?;
                }
                tx.execute(
                    "DELETE FROM chat_message
                     WHERE conversation_id = ?1
                     AND id NOT IN (
                         SELECT id FROM chat_message
                         WHERE conversation_id = ?1
                         ORDER BY id DESC
                         LIMIT ?2
                     )",
                    rusqlite::params![id, window],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    /// Messages in the window, oldest first.
    pub async fn get(&self, conversation_id: &str) -> Result<Vec<Message>, Error> {
        let id = conversation_id.to_owned();
        let window = self.window as i64;

        let rows: Vec<String> = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT data FROM (
                         SELECT id, data FROM chat_message
                         WHERE conversation_id = ?1
                         ORDER BY id DESC
                         LIMIT ?2
                     ) ORDER BY id ASC",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![id, window], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for data in rows {
            messages.push(serde_json::from_str(&data)?);
        }
        Ok(messages)
    }

    pub async fn clear(&self, conversation_id: &str) -> Result<(), Error> {
        let id = conversation_id.to_owned();
        self.db
            .call(move |conn| {
                conn.execute("DELETE FROM chat_message WHERE conversation_id = ?", [id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::initialize_db;
    use crate::openai::Role;

    async fn memory() -> ChatMemory {
        let db = Connection::open_in_memory().await.unwrap();
        db.call(|conn| {
            initialize_db(conn)?;
            Ok(())
        })
        .await
        .unwrap();
        ChatMemory::new(db)
    }

    #[tokio::test]
    async fn it_returns_messages_oldest_first() -> Result<()> {
        let memory = memory().await;
        memory.add("Maria-João", &Message::new(Role::User, "Oi")).await?;
        memory
            .add("Maria-João", &Message::new(Role::Assistant, "Olá!"))
            .await?;

        let messages = memory.get("Maria-João").await?;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role(), &Role::User);
        assert_eq!(messages[1].content, Some("Olá!".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn it_evicts_the_oldest_message_past_the_window() -> Result<()> {
        let memory = memory().await;
        for i in 0..=MEMORY_WINDOW {
            memory
                .add("Maria-João", &Message::new(Role::User, &format!("msg {}", i)))
                .await?;
        }

        let messages = memory.get("Maria-João").await?;
        assert_eq!(messages.len(), MEMORY_WINDOW);
        assert_eq!(messages[0].content, Some("msg 1".to_string()));
        assert_eq!(
            messages[MEMORY_WINDOW - 1].content,
            Some(format!("msg {}", MEMORY_WINDOW))
        );

        // Pruned rows are actually gone, not just hidden
        let stored: i64 = memory
            .db
            .call(|conn| {
                let count = conn.query_row("SELECT COUNT(*) FROM chat_message", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        assert_eq!(stored, MEMORY_WINDOW as i64);
        Ok(())
    }

    #[tokio::test]
    async fn it_stores_a_turn_in_one_transaction() -> Result<()> {
        let memory = memory().await;
        memory
            .add_many(
                "Maria-João",
                &[
                    Message::new(Role::User, "Oi"),
                    Message::new(Role::Assistant, "Olá!"),
                ],
            )
            .await?;
        let messages = memory.get("Maria-João").await?;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role(), &Role::User);
        assert_eq!(messages[1].role(), &Role::Assistant);

        // A failing insert rolls back the whole turn
        memory
            .db
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_replies BEFORE INSERT ON chat_message
                     WHEN json_extract(NEW.data, '$.role') = 'assistant'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )?;
                Ok(())
            })
            .await?;
        let result = memory
            .add_many(
                "Maria-João",
                &[
                    Message::new(Role::User, "Tchau"),
                    Message::new(Role::Assistant, "Até logo!"),
                ],
            )
            .await;
        assert!(result.is_err());
        assert_eq!(memory.get("Maria-João").await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn it_keeps_conversations_apart() -> Result<()> {
        let memory = memory().await;
        memory.add("Maria-João", &Message::new(Role::User, "Oi")).await?;
        memory.add("Maria-Ana", &Message::new(Role::User, "Bom dia")).await?;

        let joao = memory.get("Maria-João").await?;
        assert_eq!(joao.len(), 1);
        assert_eq!(joao[0].content, Some("Oi".to_string()));
        assert!(memory.get("Carlos-João").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_clears_a_conversation() -> Result<()> {
        let memory = memory().await;
        memory.add("Maria-João", &Message::new(Role::User, "Oi")).await?;
        memory.add("Maria-Ana", &Message::new(Role::User, "Bom dia")).await?;

        memory.clear("Maria-João").await?;

        assert!(memory.get("Maria-João").await?.is_empty());
        assert_eq!(memory.get("Maria-Ana").await?.len(), 1);
        Ok(())
    }
}
