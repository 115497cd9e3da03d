pub mod auth;
pub mod gcal;

pub use auth::{AccessTokenProvider, CALENDAR_SCOPE, ServiceAccountAuth, ServiceAccountKey, StaticToken};
pub use gcal::{
    AclRule, AclScope, Calendar, CalendarListEntry, Event, EventDateTime, EventQuery,
    GoogleCalendar, NewCalendar, NewEvent,
};
