//! Scheduling rules checked on the server before mutating the
//! calendar on behalf of a chat request.
//!
//! The same rules are given to the LLM in the system prompt. The
//! guard makes sure they hold even when the model ignores them.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

use crate::google::{Event, EventDateTime};

#[derive(Debug, PartialEq)]
pub enum PolicyViolation {
    NotCalendarOwner { summary: String, to_client: String },
    WrongEventSummary { summary: String, from_requester: String },
    NotEventOwner { summary: String, from_requester: String },
    InvalidDateTime(String),
    InPast(String),
    EndBeforeStart { start: String, end: String },
    Overlap { start: String, end: String },
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PolicyViolation::NotCalendarOwner { summary, to_client } => write!(
                f,
                "Refused: calendar '{}' does not belong to client '{}'",
                summary, to_client
            ),
            PolicyViolation::WrongEventSummary {
                summary,
                from_requester,
            } => write!(
                f,
                "Refused: event summary '{}' must be the requester's name '{}'. Create it again with summary '{}'",
                summary, from_requester, from_requester
            ),
            PolicyViolation::NotEventOwner {
                summary,
                from_requester,
            } => write!(
                f,
                "Refused: event '{}' does not belong to requester '{}'. Tell the user there is already an event scheduled at that time",
                summary, from_requester
            ),
            PolicyViolation::InvalidDateTime(value) => write!(
                f,
                "Refused: '{}' is not an RFC 3339 date time like 2025-10-10T16:00:00-03:00",
                value
            ),
            PolicyViolation::InPast(value) => {
                write!(f, "Refused: {} is in the past", value)
            }
            PolicyViolation::EndBeforeStart { start, end } => {
                write!(f, "Refused: end {} is not after start {}", end, start)
            }
            PolicyViolation::Overlap { start, end } => write!(
                f,
                "Refused: there is already an event scheduled between {} and {}",
                start, end
            ),
        }
    }
}

/// Who is asking and when. Bound to a single chat request.
///
/// Clones share the events booked so far in the request, so every
/// tool built from the same context sees them.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub to_client: String,
    pub from_requester: String,
    pub now: DateTime<FixedOffset>,
    booked: Arc<Mutex<Vec<Event>>>,
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn parse_date_time(value: &str) -> Result<DateTime<FixedOffset>, PolicyViolation> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|_| PolicyViolation::InvalidDateTime(value.to_string()))
}

// All-day events only carry a date, interpret it as midnight in the
// requester's offset
fn resolve(value: &EventDateTime, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    if let Some(date_time) = &value.date_time {
        return DateTime::parse_from_rfc3339(date_time).ok();
    }
    let date = NaiveDate::parse_from_str(value.date.as_deref()?, "%Y-%m-%d").ok()?;
    offset
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()
}

fn is_cancelled(event: &Event) -> bool {
    event.status.as_deref() == Some("cancelled")
}

impl RequestContext {
    pub fn new(to_client: &str, from_requester: &str, now: DateTime<FixedOffset>) -> Self {
        Self {
            to_client: to_client.to_string(),
            from_requester: from_requester.to_string(),
            now,
            booked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Remember an event created during this request. The calendar API
    /// may not list it yet when the next event is checked.
    pub fn record_booking(&self, event: Event) {
        self.booked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    fn booked_events(&self) -> Vec<Event> {
        self.booked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Calendars are named after, and only managed for, `to_client`.
    pub fn check_calendar_owner(&self, summary: &str) -> Result<(), PolicyViolation> {
        if same_name(summary, &self.to_client) {
            Ok(())
        } else {
            Err(PolicyViolation::NotCalendarOwner {
                summary: summary.to_string(),
                to_client: self.to_client.clone(),
            })
        }
    }

    /// A new event must be owned by the requester, start in the
    /// future and end after it starts. It can't overlap `existing` or
    /// anything booked earlier in the request.
    pub fn check_new_event(
        &self,
        summary: &str,
        start: &str,
        end: &str,
        existing: &[Event],
    ) -> Result<(), PolicyViolation> {
        if !same_name(summary, &self.from_requester) {
            return Err(PolicyViolation::WrongEventSummary {
                summary: summary.to_string(),
                from_requester: self.from_requester.clone(),
            });
        }

        let start_at = parse_date_time(start)?;
        let end_at = parse_date_time(end)?;
        if start_at < self.now {
            return Err(PolicyViolation::InPast(start.to_string()));
        }
        if end_at <= start_at {
            return Err(PolicyViolation::EndBeforeStart {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let offset = self.now.offset();
        let booked = self.booked_events();
        for event in existing
            .iter()
            .chain(booked.iter())
            .filter(|e| !is_cancelled(e))
        {
            let (Some(other_start), Some(other_end)) =
                (resolve(&event.start, offset), resolve(&event.end, offset))
            else {
                continue;
            };
            if start_at < other_end && other_start < end_at {
                return Err(PolicyViolation::Overlap {
                    start: other_start.to_rfc3339(),
                    end: other_end.to_rfc3339(),
                });
            }
        }

        Ok(())
    }

    /// Only the requester's own events that haven't started yet can
    /// be removed.
    pub fn check_event_removal(&self, event: &Event) -> Result<(), PolicyViolation> {
        if !same_name(&event.summary, &self.from_requester) {
            return Err(PolicyViolation::NotEventOwner {
                summary: event.summary.clone(),
                from_requester: self.from_requester.clone(),
            });
        }
        if let Some(start) = resolve(&event.start, self.now.offset())
            && start < self.now
        {
            return Err(PolicyViolation::InPast(start.to_rfc3339()));
        }
        Ok(())
    }
}
