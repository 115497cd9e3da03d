use std::sync::Arc;

use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{function, to_json};
use crate::openai::{Function, Property, ToolCall, ToolType};
use crate::schedule::{RequestContext, ScheduleService};

const DATE_TIME_FORMAT: &str = "RFC 3339 date time with offset, e.g. 2025-10-10T16:00:00-03:00";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventProps {
    pub calendar_id: Property,
    pub summary: Property,
    pub description: Property,
    pub start: Property,
    pub end: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventArgs {
    calendar_id: String,
    summary: String,
    description: String,
    start: String,
    end: String,
}

#[derive(Serialize)]
pub struct CreateEventTool {
    pub r#type: ToolType,
    pub function: Function<CreateEventProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
    #[serde(skip)]
    context: Option<RequestContext>,
}

impl CreateEventTool {
    pub fn new(service: Arc<ScheduleService>, context: Option<RequestContext>) -> Self {
        let function = function(
            "create_event",
            "Schedule an event in a calendar. The event summary is the requester's name (fromRequester).",
            CreateEventProps {
                calendar_id: Property::string("ID of the calendar"),
                summary: Property::string("Name of the requester the event belongs to"),
                description: Property::string("What the event is about"),
                start: Property::string(&format!("Start of the event as an {}", DATE_TIME_FORMAT)),
                end: Property::string(&format!("End of the event as an {}", DATE_TIME_FORMAT)),
            },
            &["calendarId", "summary", "description", "start", "end"],
        );
        Self {
            r#type: ToolType::Function,
            function,
            service,
            context,
        }
    }
}

#[async_trait]
impl ToolCall for CreateEventTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: CreateEventArgs = serde_json::from_str(args)?;

        if let Some(ctx) = &self.context {
            // Check the request on its own before asking the API for
            // what's already booked in that slot
            if let Err(violation) =
                ctx.check_new_event(&fn_args.summary, &fn_args.start, &fn_args.end, &[])
            {
                return Ok(violation.to_string());
            }
            let existing = self
                .service
                .get_events_by_date_range(&fn_args.calendar_id, &fn_args.start, &fn_args.end)
                .await?;
            if let Err(violation) =
                ctx.check_new_event(&fn_args.summary, &fn_args.start, &fn_args.end, &existing)
            {
                return Ok(violation.to_string());
            }
        }

        let event = self
            .service
            .create_event(
                &fn_args.calendar_id,
                &fn_args.summary,
                &fn_args.description,
                &fn_args.start,
                &fn_args.end,
            )
            .await?;
        if let Some(ctx) = &self.context {
            ctx.record_booking(event.clone());
        }
        to_json(&event)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventProps {
    pub calendar_id: Property,
    pub event_id: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteEventArgs {
    calendar_id: String,
    event_id: String,
}

#[derive(Serialize)]
pub struct DeleteEventTool {
    pub r#type: ToolType,
    pub function: Function<DeleteEventProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
    #[serde(skip)]
    context: Option<RequestContext>,
}

impl DeleteEventTool {
    pub fn new(service: Arc<ScheduleService>, context: Option<RequestContext>) -> Self {
        let function = function(
            "delete_event",
            "Remove an event from a calendar. Only events of the requester (fromRequester) that haven't started yet can be removed.",
            DeleteEventProps {
                calendar_id: Property::string("ID of the calendar"),
                event_id: Property::string("ID of the event to remove"),
            },
            &["calendarId", "eventId"],
        );
        Self {
            r#type: ToolType::Function,
            function,
            service,
            context,
        }
    }
}

#[async_trait]
impl ToolCall for DeleteEventTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: DeleteEventArgs = serde_json::from_str(args)?;
        if let Some(ctx) = &self.context {
            let event = self
                .service
                .get_event(&fn_args.calendar_id, &fn_args.event_id)
                .await?;
            if let Err(violation) = ctx.check_event_removal(&event) {
                return Ok(violation.to_string());
            }
        }
        let deleted = self
            .service
            .delete_event(&fn_args.calendar_id, &fn_args.event_id)
            .await?;
        to_json(&deleted)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordProps {
    pub calendar_id: Property,
    pub keyword: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeywordArgs {
    calendar_id: String,
    keyword: String,
}

#[derive(Serialize)]
pub struct GetEventsTool {
    pub r#type: ToolType,
    pub function: Function<KeywordProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
}

impl GetEventsTool {
    pub fn new(service: Arc<ScheduleService>) -> Self {
        let function = function(
            "get_events",
            "Search the events of a calendar by keyword, ordered by start time.",
            KeywordProps {
                calendar_id: Property::string("ID of the calendar"),
                keyword: Property::string("Free text to match, usually the requester's name"),
            },
            &["calendarId", "keyword"],
        );
        Self {
            r#type: ToolType::Function,
            function,
            service,
        }
    }
}

#[async_trait]
impl ToolCall for GetEventsTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: KeywordArgs = serde_json::from_str(args)?;
        let events = self
            .service
            .get_events(&fn_args.calendar_id, &fn_args.keyword)
            .await?;
        to_json(&events)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeProps {
    pub calendar_id: Property,
    pub start: Property,
    pub end: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateRangeArgs {
    calendar_id: String,
    start: String,
    end: String,
}

#[derive(Serialize)]
pub struct GetEventsByDateRangeTool {
    pub r#type: ToolType,
    pub function: Function<DateRangeProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
}

impl GetEventsByDateRangeTool {
    pub fn new(service: Arc<ScheduleService>) -> Self {
        let function = function(
            "get_events_by_date_range",
            "List the events of a calendar between two date times, ordered by start time. Use it to check whether a slot is free.",
            DateRangeProps {
                calendar_id: Property::string("ID of the calendar"),
                start: Property::string(&format!("Lower bound as an {}", DATE_TIME_FORMAT)),
                end: Property::string(&format!("Upper bound as an {}", DATE_TIME_FORMAT)),
            },
            &["calendarId", "start", "end"],
        );
        Self {
            r#type: ToolType::Function,
            function,
            service,
        }
    }
}

#[async_trait]
impl ToolCall for GetEventsByDateRangeTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: DateRangeArgs = serde_json::from_str(args)?;
        let events = self
            .service
            .get_events_by_date_range(&fn_args.calendar_id, &fn_args.start, &fn_args.end)
            .await?;
        to_json(&events)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeKeywordProps {
    pub calendar_id: Property,
    pub start: Property,
    pub end: Property,
    pub keyword: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateRangeKeywordArgs {
    calendar_id: String,
    start: String,
    end: String,
    keyword: String,
}

#[derive(Serialize)]
pub struct GetEventsByDateRangeAndKeywordTool {
    pub r#type: ToolType,
    pub function: Function<DateRangeKeywordProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
}

impl GetEventsByDateRangeAndKeywordTool {
    pub fn new(service: Arc<ScheduleService>) -> Self {
        let function = function(
            "get_events_by_date_range_and_keyword",
            "Search the events of a calendar by keyword between two date times, ordered by start time. Use it to find the requester's upcoming appointments.",
            DateRangeKeywordProps {
                calendar_id: Property::string("ID of the calendar"),
                start: Property::string(&format!("Lower bound as an {}", DATE_TIME_FORMAT)),
                end: Property::string(&format!("Upper bound as an {}", DATE_TIME_FORMAT)),
                keyword: Property::string("Free text to match, usually the requester's name"),
            },
            &["calendarId", "start", "end", "keyword"],
        );
        Self {
            r#type: ToolType::Function,
            function,
            service,
        }
    }
}

#[async_trait]
impl ToolCall for GetEventsByDateRangeAndKeywordTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: DateRangeKeywordArgs = serde_json::from_str(args)?;
        let events = self
            .service
            .get_events_by_date_range_and_keyword(
                &fn_args.calendar_id,
                &fn_args.start,
                &fn_args.end,
                &fn_args.keyword,
            )
            .await?;
        to_json(&events)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}
