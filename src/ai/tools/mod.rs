use std::sync::Arc;

use anyhow::{Error, Result};
use serde::Serialize;

use crate::openai::{BoxedToolCall, Function, Parameters};
use crate::schedule::{RequestContext, ScheduleService};

pub mod calendars;
pub use calendars::{
    CreateCalendarTool, DeleteCalendarTool, FindCalendarBySummaryTool, GetCalendarTool,
    ListCalendarsTool,
};

pub mod events;
pub use events::{
    CreateEventTool, DeleteEventTool, GetEventsByDateRangeAndKeywordTool,
    GetEventsByDateRangeTool, GetEventsTool,
};

/// Every calendar operation the LLM may call. When `context` is set
/// the mutating tools refuse requests that break the scheduling rules
/// for that client and requester.
pub fn calendar_tools(
    service: Arc<ScheduleService>,
    context: Option<RequestContext>,
) -> Vec<BoxedToolCall> {
    vec![
        Box::new(CreateCalendarTool::new(service.clone(), context.clone())),
        Box::new(ListCalendarsTool::new(service.clone())),
        Box::new(GetCalendarTool::new(service.clone())),
        Box::new(FindCalendarBySummaryTool::new(service.clone())),
        Box::new(DeleteCalendarTool::new(service.clone(), context.clone())),
        Box::new(CreateEventTool::new(service.clone(), context.clone())),
        Box::new(DeleteEventTool::new(service.clone(), context)),
        Box::new(GetEventsTool::new(service.clone())),
        Box::new(GetEventsByDateRangeTool::new(service.clone())),
        Box::new(GetEventsByDateRangeAndKeywordTool::new(service)),
    ]
}

// All arguments are required so the schema can be strict
fn function<Props: Serialize>(
    name: &str,
    description: &str,
    properties: Props,
    required: &[&str],
) -> Function<Props> {
    Function {
        name: name.to_string(),
        description: description.to_string(),
        parameters: Parameters {
            r#type: String::from("object"),
            properties,
            required: required.iter().map(|s| s.to_string()).collect(),
            additional_properties: false,
        },
        strict: true,
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let out = serde_json::to_string(value)?;
    Ok(out)
}

#[derive(Serialize)]
pub struct NoProps {}
