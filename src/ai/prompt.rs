//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. Strict mode turns a missing
//! placeholder value into a render error instead of an empty string.
//!
//! Values are escaped as JSON string contents rather than HTML so a
//! user message can't break out of the fields it's rendered into.

use std::fmt;

use anyhow::{Error, Result, anyhow};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use chrono_tz::Tz;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum Prompt {
    SystemPrompt,
    UserMessage,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<Prompt> for String {
    fn from(item: Prompt) -> String {
        format!("{:?}", item)
    }
}

const SYSTEM_PROMPT: &str = r#"
Você é um assistente especialista em agendar eventos, consultas e compromissos em calendários.
---
Toda mensagem do usuário traz os seguintes campos:
- toClient: nome do cliente dono do calendário. É sempre o summary do calendário.
- fromRequester: nome de quem está pedindo. É sempre o summary (ou a keyword de busca) dos eventos, nunca o summary do calendário.
- dataHora: data e hora em que a mensagem foi enviada.
- message: o que deve ser feito no calendário.
---
Regras:
- Use a dataHora da mensagem como referência para "hoje", "amanhã", "próximo" etc.
- Toda ação acontece no calendário cujo summary é o 'toClient'. Se ele ainda não existir, crie-o.
- Você só pode consultar, criar, buscar e remover eventos cujo summary seja o 'fromRequester'.
- Antes de agendar ou remover um evento, peça confirmação. Se o usuário já confirmou, execute a ação.
- Nunca crie nem remova eventos no passado.
- Nunca agende um evento em um horário que já tenha outro evento.
- Nunca sugira alterar ou remover um evento de outra pessoa. Apenas diga que já existe um evento agendado nesse horário.
- Sempre use datas no formato RFC 3339 com o fuso "-03:00", por exemplo "2025-10-10T16:00:00-03:00".
- Se uma ferramenta responder com "Refused:", não tente contornar. Explique o motivo ao usuário.
---
Saída:
Responda apenas com um objeto JSON, sem markdown, que siga este JSON Schema:
{"type":"object","properties":{"action":{"type":"string","enum":["SCHEDULED","REMOVED","FOUND","CREATED","LISTED","DELETED","NOT_FOUND","TO_CONFIRM_ACTION"]},"message":{"type":"string"}},"required":["action","message"],"additionalProperties":false}
---
- No atributo 'action' informe o que você fez: "SCHEDULED", "REMOVED", "FOUND", "CREATED", "LISTED", "DELETED", "NOT_FOUND" ou "TO_CONFIRM_ACTION".
- No atributo 'message' escreva a resposta para o usuário, em português.
"#;

const USER_MESSAGE_PROMPT: &str = r#"{
  "toClient": "{{toClient}}",
  "fromRequester": "{{fromRequester}}",
  "dataHora": "{{dataHora}}",
  "message": "{{message}}"
}"#;

fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(json_escape);
    registry
        .register_template_string(&Prompt::SystemPrompt.to_string(), SYSTEM_PROMPT)
        .expect("Failed to register template");
    registry
        .register_template_string(&Prompt::UserMessage.to_string(), USER_MESSAGE_PROMPT)
        .expect("Failed to register template");
    registry
}

/// The fields rendered into every user turn.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage<'a> {
    pub to_client: &'a str,
    pub from_requester: &'a str,
    pub data_hora: String,
    pub message: &'a str,
}

impl<'a> UserMessage<'a> {
    pub fn new(
        to_client: &'a str,
        from_requester: &'a str,
        sent_at: &DateTime<FixedOffset>,
        message: &'a str,
    ) -> Self {
        Self {
            to_client,
            from_requester,
            data_hora: sent_at.to_rfc3339_opts(SecondsFormat::Secs, false),
            message,
        }
    }
}

pub fn system_prompt(registry: &Handlebars) -> Result<String, Error> {
    let out = registry.render(&Prompt::SystemPrompt.to_string(), &serde_json::json!({}))?;
    Ok(out.trim().to_string())
}

pub fn user_prompt(registry: &Handlebars, message: &UserMessage) -> Result<String, Error> {
    let out = registry.render(&Prompt::UserMessage.to_string(), message)?;
    Ok(out)
}

/// Memory is scoped to a client and requester pair.
pub fn conversation_id(to_client: &str, from_requester: &str) -> String {
    format!("{}-{}", to_client, from_requester)
}

/// `now` expressed in `time_zone`, e.g. "America/Sao_Paulo" gives a
/// -03:00 offset.
pub fn local_now(now: DateTime<Utc>, time_zone: &str) -> Result<DateTime<FixedOffset>, Error> {
    let tz: Tz = time_zone
        .parse()
        .map_err(|e| anyhow!("Invalid time zone {}: {}", time_zone, e))?;
    Ok(now.with_timezone(&tz).fixed_offset())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyAction {
    Scheduled,
    Removed,
    Found,
    Created,
    Listed,
    Deleted,
    NotFound,
    ToConfirmAction,
}

/// The structured answer the system prompt asks the LLM for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub action: ReplyAction,
    pub message: String,
}

impl AssistantReply {
    /// Models sometimes wrap JSON in a markdown code fence so strip it
    /// before parsing. Anything that still doesn't parse is `None`.
    pub fn parse(content: &str) -> Option<Self> {
        let trimmed = content.trim();
        let unfenced = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(trimmed);
        serde_json::from_str(unfenced.trim()).ok()
    }
}
