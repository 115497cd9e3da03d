use std::sync::Arc;

use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{NoProps, function, to_json};
use crate::openai::{Function, Property, ToolCall, ToolType};
use crate::schedule::{RequestContext, ScheduleService};

#[derive(Serialize)]
pub struct SummaryProps {
    pub summary: Property,
}

#[derive(Deserialize)]
struct SummaryArgs {
    summary: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarIdProps {
    pub calendar_id: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarIdArgs {
    calendar_id: String,
}

#[derive(Serialize)]
pub struct CreateCalendarTool {
    pub r#type: ToolType,
    pub function: Function<SummaryProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
    #[serde(skip)]
    context: Option<RequestContext>,
}

impl CreateCalendarTool {
    pub fn new(service: Arc<ScheduleService>, context: Option<RequestContext>) -> Self {
        let function = function(
            "create_calendar",
            "Create a new calendar named after the client. If a calendar with that name already exists it is returned instead.",
            SummaryProps {
                summary: Property::string("Name of the calendar, the client's name (toClient)"),
            },
            &["summary"],
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
impl ToolCall for CreateCalendarTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: SummaryArgs = serde_json::from_str(args)?;
        if let Some(ctx) = &self.context
            && let Err(violation) = ctx.check_calendar_owner(&fn_args.summary)
        {
            return Ok(violation.to_string());
        }

        if let Some(existing) = self.service.find_calendar_by_summary(&fn_args.summary).await? {
            return to_json(&existing);
        }
        let calendar = self.service.create_calendar(&fn_args.summary).await?;
        to_json(&calendar)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

#[derive(Serialize)]
pub struct ListCalendarsTool {
    pub r#type: ToolType,
    pub function: Function<NoProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
}

impl ListCalendarsTool {
    pub fn new(service: Arc<ScheduleService>) -> Self {
        let function = function(
            "list_calendars",
            "List all calendars available to the assistant.",
            NoProps {},
            &[],
        );
        Self {
            r#type: ToolType::Function,
            function,
            service,
        }
    }
}

#[async_trait]
impl ToolCall for ListCalendarsTool {
    async fn call(&self, _args: &str) -> Result<String, Error> {
        let calendars = self.service.list_calendars().await?;
        to_json(&calendars)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

#[derive(Serialize)]
pub struct GetCalendarTool {
    pub r#type: ToolType,
    pub function: Function<CalendarIdProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
}

impl GetCalendarTool {
    pub fn new(service: Arc<ScheduleService>) -> Self {
        let function = function(
            "get_calendar",
            "Get a calendar by its ID.",
            CalendarIdProps {
                calendar_id: Property::string("ID of the calendar"),
            },
            &["calendarId"],
        );
        Self {
            r#type: ToolType::Function,
            function,
            service,
        }
    }
}

#[async_trait]
impl ToolCall for GetCalendarTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: CalendarIdArgs = serde_json::from_str(args)?;
        let calendar = self.service.get_calendar(&fn_args.calendar_id).await?;
        to_json(&calendar)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

#[derive(Serialize)]
pub struct FindCalendarBySummaryTool {
    pub r#type: ToolType,
    pub function: Function<SummaryProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
}

impl FindCalendarBySummaryTool {
    pub fn new(service: Arc<ScheduleService>) -> Self {
        let function = function(
            "find_calendar_by_summary",
            "Find a calendar by its name, ignoring case. Use this to get the calendar ID of the client (toClient).",
            SummaryProps {
                summary: Property::string("Name of the calendar to look for"),
            },
            &["summary"],
        );
        Self {
            r#type: ToolType::Function,
            function,
            service,
        }
    }
}

#[async_trait]
impl ToolCall for FindCalendarBySummaryTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: SummaryArgs = serde_json::from_str(args)?;
        match self.service.find_calendar_by_summary(&fn_args.summary).await? {
            Some(calendar) => to_json(&calendar),
            None => Ok(format!("No calendar found with summary: {}", fn_args.summary)),
        }
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

#[derive(Serialize)]
pub struct DeleteCalendarTool {
    pub r#type: ToolType,
    pub function: Function<CalendarIdProps>,
    #[serde(skip)]
    service: Arc<ScheduleService>,
    #[serde(skip)]
    context: Option<RequestContext>,
}

impl DeleteCalendarTool {
    pub fn new(service: Arc<ScheduleService>, context: Option<RequestContext>) -> Self {
        let function = function(
            "delete_calendar",
            "Delete a calendar by its ID. Only the client's own calendar can be deleted.",
            CalendarIdProps {
                calendar_id: Property::string("ID of the calendar to delete"),
            },
            &["calendarId"],
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
impl ToolCall for DeleteCalendarTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: CalendarIdArgs = serde_json::from_str(args)?;
        if let Some(ctx) = &self.context {
            let calendar = self.service.get_calendar(&fn_args.calendar_id).await?;
            if let Err(violation) = ctx.check_calendar_owner(&calendar.summary) {
                return Ok(violation.to_string());
            }
        }
        let deleted = self.service.delete_calendar(&fn_args.calendar_id).await?;
        to_json(&deleted)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}
