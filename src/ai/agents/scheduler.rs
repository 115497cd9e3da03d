use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use chrono::{DateTime, Utc};

use crate::ai::chat::{ChatBuilder, ChatMemory};
use crate::ai::prompt::{
    AssistantReply, UserMessage, conversation_id, local_now, system_prompt, templates, user_prompt,
};
use crate::ai::tools::calendar_tools;
use crate::core::AppConfig;
use crate::openai::{Message, Role};
use crate::schedule::{RequestContext, ScheduleService};

/// A single turn of the scheduling assistant on behalf of
/// `from_requester` in the calendar of `to_client`.
///
/// The LLM decides which calendar tools to call. The conversation is
/// remembered per client and requester pair. Returns the raw reply
/// content, which is normally an `AssistantReply` encoded as JSON.
pub async fn scheduling_response(
    config: &AppConfig,
    schedule: Arc<ScheduleService>,
    memory: &ChatMemory,
    to_client: &str,
    from_requester: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<String, Error> {
    let sent_at = local_now(now, &config.calendar_time_zone)?;
    let chat_id = conversation_id(to_client, from_requester);

    let (system_msg, user_msg) = {
        let registry = templates();
        let user = UserMessage::new(to_client, from_requester, &sent_at, message);
        (system_prompt(&registry)?, user_prompt(&registry, &user)?)
    };

    let context = config
        .enforce_policy
        .then(|| RequestContext::new(to_client, from_requester, sent_at));
    let tools = calendar_tools(schedule, context);

    let mut chat = ChatBuilder::new(
        &config.openai_api_hostname,
        &config.openai_api_key,
        &config.openai_model,
    )
    .system_prompt(&system_msg)
    .memory(memory, &chat_id)
    .tools(tools)
    .build();

    tracing::info!("Chat turn for conversation {}", chat_id);
    let messages = chat.next_msg(Message::new(Role::User, &user_msg)).await?;
    let content = messages
        .last()
        .and_then(|m| m.content.clone())
        .ok_or(anyhow!("Chat reply has no content"))?;

    match AssistantReply::parse(&content) {
        Some(reply) => tracing::info!("Conversation {} action: {:?}", chat_id, reply.action),
        None => tracing::warn!("Conversation {} reply is not structured: {}", chat_id, content),
    }

    Ok(content)
}
