//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use axum::{Router, body::Body};

use agenda::api::AppState;
use agenda::api::app;
use agenda::core::AppConfig;
use agenda::core::db::initialize_db;
use agenda::google::{GoogleCalendar, StaticToken};
use agenda::schedule::ScheduleService;

/// Creates a test application router backed by an in-memory db. The
/// LLM and the calendar API are expected to be mock servers.
///
/// The shared state is returned too so tests can inspect the chat
/// memory after a request.
pub async fn test_app(llm_url: &str, calendar_url: &str) -> (Router, Arc<AppState>) {
    let db = tokio_rusqlite::Connection::open_in_memory()
        .await
        .expect("Failed to open in-memory db");
    db.call(|conn| {
        initialize_db(conn).expect("Failed to migrate db");
        Ok(())
    })
    .await
    .unwrap();

    let app_config = AppConfig {
        storage_path: String::from("./"),
        db_path: String::from(":memory:"),
        credentials_path: String::from("./tests/data/service_account.json"),
        calendar_api_url: calendar_url.to_string(),
        calendar_time_zone: String::from("America/Sao_Paulo"),
        share_calendars_with: None,
        enforce_policy: true,
        openai_model: String::from("gpt-test"),
        openai_api_hostname: llm_url.to_string(),
        openai_api_key: String::from("test-api-key"),
    };

    let client = GoogleCalendar::new(
        calendar_url,
        Arc::new(StaticToken(String::from("test-token"))),
    );
    let schedule = ScheduleService::new(client, &app_config.calendar_time_zone, None);

    let state = Arc::new(AppState::new(db, app_config, schedule));
    (app(Arc::clone(&state)), state)
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not utf-8")
}

/// A chat completion response where the model calls a single tool
pub fn tool_call_response(id: &str, name: &str, arguments: serde_json::Value) -> String {
    serde_json::json!({
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments.to_string()}
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
    .to_string()
}

/// A chat completion response with the model's final answer
pub fn content_response(content: &str) -> String {
    serde_json::json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}
