use anyhow::{Error, Result, anyhow, bail};
use serde_json::Value;

use super::memory::ChatMemory;
use super::models::Transcript;
use crate::openai::{BoxedToolCall, FunctionCall, FunctionCallFn, Message, Role, completion};

// A model stuck calling tools in circles shouldn't hold a request
// open forever
const MAX_TOOL_ROUNDS: usize = 16;

/// The core abstraction around interacting with an LLM in a chat
/// completion style using an OpenAI compatible API.
///
/// Supports the following features:
/// - Tool calling
/// - A fixed system prompt sent on every turn
/// - Conversation memory backed by the database
///
/// Use `ChatBuilder` to construct a valid `Chat`.
pub struct Chat {
    api_hostname: String,
    api_key: String,
    model: String,
    system: Option<Message>,
    memory: Option<ChatMemory>,
    pub conversation_id: Option<String>,
    tools: Option<Vec<BoxedToolCall>>,
    transcript: Transcript,
}

impl Chat {
    async fn handle_tool_call(
        tools: &[BoxedToolCall],
        tool_call: &Value,
    ) -> Result<Vec<Message>, Error> {
        let tool_call_id = &tool_call["id"]
            .as_str()
            .ok_or(anyhow!("Tool call missing ID: {}", tool_call))?;
        let tool_call_function = &tool_call["function"];
        let tool_call_args = tool_call_function["arguments"]
            .as_str()
            .ok_or(anyhow!("Tool call missing arguments: {}", tool_call))?;
        let tool_call_name = tool_call_function["name"]
            .as_str()
            .ok_or(anyhow!("Tool call missing name: {}", tool_call))?;

        tracing::debug!("Tool call: {} args: {}", tool_call_name, tool_call_args);

        let tool = tools
            .iter()
            .find(|i| *i.function_name() == *tool_call_name)
            .ok_or(anyhow!(
                "Received tool call that doesn't exist: {}",
                tool_call_name
            ))?;

        // A failed calendar call is reported back to the model so it
        // can tell the user instead of failing the whole turn
        let tool_call_result = match tool.call(tool_call_args).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Tool call {} failed: {}", tool_call_name, e);
                format!("Error: {}", e)
            }
        };
        tracing::debug!("Tool result: {} -> {}", tool_call_name, tool_call_result);

        let tool_call_request = vec![FunctionCall {
            function: FunctionCallFn {
                arguments: tool_call_args.to_string(),
                name: tool_call_name.to_string(),
            },
            id: tool_call_id.to_string(),
            r#type: String::from("function"),
        }];
        let results = vec![
            Message::new_tool_call_request(tool_call_request),
            Message::new_tool_call_response(&tool_call_result, tool_call_id),
        ];

        Ok(results)
    }

    async fn handle_tool_calls(
        tools: &[BoxedToolCall],
        tool_calls: &[Value],
    ) -> Result<Vec<Message>, Error> {
        // One at a time and in order. A later call in the same response
        // must see what an earlier one changed in the calendar.
        let mut results = Vec::new();
        for call in tool_calls {
            results.extend(Self::handle_tool_call(tools, call).await?);
        }
        Ok(results)
    }

    /// Runs the next turn in chat. The LLM sees the system prompt,
    /// the conversation so far and `msg`. Returns every new message
    /// of the turn, the final assistant reply last.
    ///
    /// Only `msg` and the final reply are remembered. Tool call
    /// messages are part of the turn but not of the history.
    pub async fn next_msg(&mut self, msg: Message) -> Result<Vec<Message>, Error> {
        let mut history: Vec<Message> = self.system.iter().cloned().collect();
        match (&self.memory, &self.conversation_id) {
            (Some(memory), Some(id)) => history.extend(memory.get(id).await?),
            _ => history.extend(self.transcript.messages()),
        }
        history.push(msg.clone());

        let messages = Self::chat(
            &self.tools,
            history,
            &self.api_hostname,
            &self.api_key,
            &self.model,
        )
        .await?;

        let reply = messages
            .last()
            .ok_or(anyhow!("Chat turn produced no messages"))?;

        // ChatBuilder enforces that these are always set together
        if let (Some(memory), Some(id)) = (&self.memory, &self.conversation_id) {
            memory.add_many(id, &[msg, reply.clone()]).await?;
        } else {
            self.transcript.push(msg);
            self.transcript.push(reply.clone());
        }

        Ok(messages)
    }

    async fn chat(
        tools: &Option<Vec<BoxedToolCall>>,
        history: Vec<Message>,
        api_hostname: &str,
        api_key: &str,
        model: &str,
    ) -> Result<Vec<Message>, Error> {
        let mut updated_history = history;
        let mut messages = Vec::new();

        let mut resp = completion(&updated_history, tools, api_hostname, api_key, model).await?;

        // Tool calls need to be handled for the chat to proceed
        let mut rounds = 0;
        while let Some(tool_calls) = resp["choices"][0]["message"]["tool_calls"].as_array() {
            if tool_calls.is_empty() {
                break;
            }
            rounds += 1;
            if rounds > MAX_TOOL_ROUNDS {
                bail!("Gave up after {} rounds of tool calls", MAX_TOOL_ROUNDS);
            }

            let Some(tools_ref) = tools.as_ref() else {
                bail!("Received tool call but no tools were specified");
            };

            let tool_call_msgs = Self::handle_tool_calls(tools_ref, tool_calls).await?;
            for m in tool_call_msgs.into_iter() {
                messages.push(m.clone());
                updated_history.push(m);
            }

            // Provide the results of the tool calls back to the chat
            resp = completion(&updated_history, tools, api_hostname, api_key, model).await?;
        }

        match resp["choices"][0]["message"]["content"].as_str() {
            Some(msg) if !msg.trim().is_empty() => {
                messages.push(Message::new(Role::Assistant, msg));
            }
            _ => bail!("No message received. Resp:\n\n {}", resp),
        }

        Ok(messages)
    }
}

#[derive(Default)]
pub struct ChatBuilder {
    api_hostname: String,
    api_key: String,
    model: String,
    system: Option<Message>,
    memory: Option<ChatMemory>,
    conversation_id: Option<String>,
    tools: Option<Vec<BoxedToolCall>>,
    transcript: Transcript,
}

impl ChatBuilder {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }

    pub fn build(self) -> Chat {
        Chat {
            api_hostname: self.api_hostname,
            api_key: self.api_key,
            model: self.model,
            system: self.system,
            memory: self.memory,
            conversation_id: self.conversation_id,
            tools: self.tools,
            transcript: self.transcript,
        }
    }

    pub fn system_prompt(mut self, prompt: &str) -> Self {
        self.system = Some(Message::new(Role::System, prompt));
        self
    }

    /// Memory and conversation ID are always set together
    pub fn memory(mut self, memory: &ChatMemory, conversation_id: &str) -> Self {
        self.memory = Some(memory.clone());
        self.conversation_id = Some(conversation_id.to_string());
        self
    }

    pub fn tools(mut self, tools: Vec<BoxedToolCall>) -> Self {
        self.tools = Some(tools);
        self
    }
}
