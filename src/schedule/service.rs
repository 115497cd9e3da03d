//! Calendar operations exposed to the chat backend.
//!
//! Every method is a direct pass-through to the calendar API with a
//! log line before and after the call. Nothing is cached. All date
//! times are RFC 3339 strings, e.g. "2025-10-10T16:00:00-03:00".

use std::sync::Arc;

use anyhow::{Error, Result};

use crate::core::AppConfig;
use crate::google::{
    AclRule, AclScope, CALENDAR_SCOPE, Calendar, CalendarListEntry, Event, EventDateTime,
    EventQuery, GoogleCalendar, NewCalendar, NewEvent, ServiceAccountAuth, ServiceAccountKey,
};

pub struct ScheduleService {
    client: GoogleCalendar,
    time_zone: String,
    share_with: Option<String>,
}

impl ScheduleService {
    pub fn new(client: GoogleCalendar, time_zone: &str, share_with: Option<String>) -> Self {
        Self {
            client,
            time_zone: time_zone.to_string(),
            share_with,
        }
    }

    /// Authenticates with the service account key at
    /// `config.credentials_path`. Fails on a missing or invalid key.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let key = ServiceAccountKey::from_file(&config.credentials_path)?;
        tracing::info!("Using service account {}", key.client_email);
        let auth = ServiceAccountAuth::new(key, &[CALENDAR_SCOPE])?;
        let client = GoogleCalendar::new(&config.calendar_api_url, Arc::new(auth));
        Ok(Self::new(
            client,
            &config.calendar_time_zone,
            config.share_calendars_with.clone(),
        ))
    }

    pub async fn create_calendar(&self, summary: &str) -> Result<Calendar, Error> {
        tracing::info!("Creating calendar with summary: {}", summary);
        let calendar = self
            .client
            .insert_calendar(&NewCalendar {
                summary: summary.to_string(),
                time_zone: self.time_zone.clone(),
            })
            .await?;

        if let Some(email) = &self.share_with {
            let rule = AclRule {
                id: None,
                role: String::from("writer"),
                scope: AclScope {
                    r#type: String::from("user"),
                    value: email.clone(),
                },
            };
            self.client.insert_acl(&calendar.id, &rule).await?;
            tracing::info!("Shared calendar {} with {}", calendar.id, email);
        }

        tracing::info!("Created calendar: {:?}", calendar);
        Ok(calendar)
    }

    pub async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>, Error> {
        tracing::info!("Listing all calendars");
        let calendars = self.client.list_calendars().await?;
        tracing::info!("Listed calendars: {:?}", calendars);
        Ok(calendars)
    }

    pub async fn delete_calendar(&self, calendar_id: &str) -> Result<bool, Error> {
        tracing::info!("Deleting calendar with ID: {}", calendar_id);
        self.client.delete_calendar(calendar_id).await?;
        tracing::info!("Deleted calendar with ID: {}", calendar_id);
        Ok(true)
    }

    pub async fn get_calendar(&self, calendar_id: &str) -> Result<Calendar, Error> {
        tracing::info!("Getting calendar with ID: {}", calendar_id);
        let calendar = self.client.get_calendar(calendar_id).await?;
        tracing::info!("Got calendar: {:?}", calendar);
        Ok(calendar)
    }

    /// Case-insensitive lookup by name. A missing calendar is `None`,
    /// not an error.
    pub async fn find_calendar_by_summary(&self, summary: &str) -> Result<Option<Calendar>, Error> {
        tracing::info!("Finding calendar by summary: {}", summary);
        let needle = summary.to_lowercase();
        let entry = self
            .list_calendars()
            .await?
            .into_iter()
            .find(|c| c.summary.to_lowercase() == needle);

        match entry {
            Some(entry) => {
                tracing::info!("Found calendar with ID: {}", entry.id);
                let calendar = self.client.get_calendar(&entry.id).await?;
                tracing::info!("Found calendar: {:?}", calendar);
                Ok(Some(calendar))
            }
            None => {
                tracing::warn!("No calendar found with summary: {}", summary);
                Ok(None)
            }
        }
    }

    pub async fn create_event(
        &self,
        calendar_id: &str,
        summary: &str,
        description: &str,
        start: &str,
        end: &str,
    ) -> Result<Event, Error> {
        tracing::info!(
            "Creating event in calendarId: {} with summary: {}, description: {}, start: {}, end: {}",
            calendar_id,
            summary,
            description,
            start,
            end
        );
        let event = NewEvent {
            summary: summary.to_string(),
            description: description.to_string(),
            start: EventDateTime::from_rfc3339(start),
            end: EventDateTime::from_rfc3339(end),
        };
        let created = self.client.insert_event(calendar_id, &event).await?;
        tracing::info!("Created event: {:?}", created);
        Ok(created)
    }

    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Event, Error> {
        tracing::info!("Getting event with ID: {} from calendarId: {}", event_id, calendar_id);
        let event = self.client.get_event(calendar_id, event_id).await?;
        tracing::info!("Got event: {:?}", event);
        Ok(event)
    }

    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<bool, Error> {
        tracing::info!("Deleting event with ID: {} from calendarId: {}", event_id, calendar_id);
        self.client.delete_event(calendar_id, event_id).await?;
        tracing::info!("Deleted event with ID: {} from calendarId: {}", event_id, calendar_id);
        Ok(true)
    }

    pub async fn get_events(&self, calendar_id: &str, keyword: &str) -> Result<Vec<Event>, Error> {
        tracing::info!("Searching events in calendarId: {} with query: {}", calendar_id, keyword);
        let query = EventQuery {
            keyword: Some(keyword.to_string()),
            ..Default::default()
        };
        let events = self.client.list_events(calendar_id, &query).await?;
        tracing::info!("Found events: {:?}", events);
        Ok(events)
    }

    pub async fn get_events_by_date_range(
        &self,
        calendar_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<Event>, Error> {
        tracing::info!("Searching events in calendarId: {} from {} to {}", calendar_id, start, end);
        let query = EventQuery {
            keyword: None,
            time_min: Some(start.to_string()),
            time_max: Some(end.to_string()),
        };
        let events = self.client.list_events(calendar_id, &query).await?;
        tracing::info!("Found events in date range: {:?}", events);
        Ok(events)
    }

    pub async fn get_events_by_date_range_and_keyword(
        &self,
        calendar_id: &str,
        start: &str,
        end: &str,
        keyword: &str,
    ) -> Result<Vec<Event>, Error> {
        tracing::info!(
            "Searching events in calendarId: {} from {} to {} with keyword: {}",
            calendar_id,
            start,
            end,
            keyword
        );
        let query = EventQuery {
            keyword: Some(keyword.to_string()),
            time_min: Some(start.to_string()),
            time_max: Some(end.to_string()),
        };
        let events = self.client.list_events(calendar_id, &query).await?;
        tracing::info!("Found events in date range with keyword: {:?}", events);
        Ok(events)
    }
}
