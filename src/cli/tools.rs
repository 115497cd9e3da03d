use std::sync::Arc;

use anyhow::Result;

use crate::ai::tools::calendar_tools;
use crate::core::AppConfig;
use crate::google::{GoogleCalendar, StaticToken};
use crate::schedule::ScheduleService;

/// Print the tool schema sent to the LLM. Nothing is called so no
/// credentials are needed.
pub fn run() -> Result<()> {
    let config = AppConfig::default();
    let client = GoogleCalendar::new(
        &config.calendar_api_url,
        Arc::new(StaticToken(String::new())),
    );
    let service = ScheduleService::new(client, &config.calendar_time_zone, None);
    let tools = calendar_tools(Arc::new(service), None);
    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}
