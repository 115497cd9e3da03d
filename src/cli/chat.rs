use std::sync::Arc;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::agents::scheduling_response;
use crate::ai::chat::ChatMemory;
use crate::ai::prompt::{AssistantReply, conversation_id};
use crate::core::{AppConfig, db::migrated_db};
use crate::schedule::ScheduleService;

/// Talk to the scheduling assistant from the terminal as
/// `from_requester` in the calendar of `to_client`. Uses the same
/// memory as the HTTP API so a conversation can continue across both.
pub async fn run(to_client: &str, from_requester: &str, reset: bool) -> Result<()> {
    let config = AppConfig::default();
    let db = migrated_db(&config.db_path).await?;
    let memory = ChatMemory::new(db);
    let schedule = Arc::new(ScheduleService::from_config(&config)?);

    if reset {
        memory
            .clear(&conversation_id(to_client, from_requester))
            .await?;
    }

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let content = scheduling_response(
                    &config,
                    schedule.clone(),
                    &memory,
                    to_client,
                    from_requester,
                    &line,
                    chrono::Utc::now(),
                )
                .await;
                match content {
                    Ok(content) => match AssistantReply::parse(&content) {
                        Some(reply) => println!("[{:?}] {}", reply.action, reply.message),
                        None => println!("{}", content),
                    },
                    Err(err) => println!("Error: {}", err),
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
