//! Google Calendar v3 REST client

use std::sync::Arc;

use anyhow::{Error, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::auth::AccessTokenProvider;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCalendar {
    pub summary: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    // Calendars shared without a name come back with no summary
    #[serde(default)]
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_role: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclScope {
    pub r#type: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: String,
    pub scope: AclScope,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    // Set instead of `date_time` for all-day events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn from_rfc3339(date_time: &str) -> Self {
        Self {
            date_time: Some(date_time.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsResponse {
    #[serde(default)]
    items: Vec<Event>,
    next_page_token: Option<String>,
}

/// Filters for listing events. Results are always expanded into
/// single occurrences and ordered by start time.
#[derive(Debug, Default, Clone)]
pub struct EventQuery {
    pub keyword: Option<String>,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
}

impl EventQuery {
    fn params(&self, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("orderBy", String::from("startTime")),
            ("singleEvents", String::from("true")),
        ];
        if let Some(q) = &self.keyword {
            params.push(("q", q.clone()));
        }
        if let Some(time_min) = &self.time_min {
            params.push(("timeMin", time_min.clone()));
        }
        if let Some(time_max) = &self.time_max {
            params.push(("timeMax", time_max.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        params
    }
}

/// Thin client over the calendar REST API. Cheap to clone and safe
/// to share between requests.
#[derive(Clone)]
pub struct GoogleCalendar {
    http: Client,
    base_url: String,
    auth: Arc<dyn AccessTokenProvider>,
}

impl GoogleCalendar {
    pub fn new(base_url: &str, auth: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn url(&self, segments: &[&str]) -> String {
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, Error> {
        let token = self.auth.access_token().await?;
        let res = req
            .bearer_auth(token)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("Calendar API request failed: {} ({})", status, text);
        }
        Ok(res)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, Error> {
        let res = self.send(req).await?;
        let text = res.text().await?;
        let out: T = serde_json::from_str(&text)?;
        Ok(out)
    }

    pub async fn insert_calendar(&self, calendar: &NewCalendar) -> Result<Calendar, Error> {
        let req = self.http.post(self.url(&["calendars"])).json(calendar);
        self.send_json(req).await
    }

    pub async fn get_calendar(&self, calendar_id: &str) -> Result<Calendar, Error> {
        let req = self.http.get(self.url(&["calendars", calendar_id]));
        self.send_json(req).await
    }

    pub async fn delete_calendar(&self, calendar_id: &str) -> Result<(), Error> {
        let req = self.http.delete(self.url(&["calendars", calendar_id]));
        self.send(req).await?;
        Ok(())
    }

    /// List every calendar visible to the authenticated account,
    /// following pagination.
    pub async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>, Error> {
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.http.get(self.url(&["users", "me", "calendarList"]));
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token)]);
            }
            let page: CalendarListResponse = self.send_json(req).await?;
            calendars.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(calendars)
    }

    pub async fn insert_acl(&self, calendar_id: &str, rule: &AclRule) -> Result<AclRule, Error> {
        let req = self
            .http
            .post(self.url(&["calendars", calendar_id, "acl"]))
            .json(rule);
        self.send_json(req).await
    }

    pub async fn insert_event(&self, calendar_id: &str, event: &NewEvent) -> Result<Event, Error> {
        let req = self
            .http
            .post(self.url(&["calendars", calendar_id, "events"]))
            .json(event);
        self.send_json(req).await
    }

    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Event, Error> {
        let req = self
            .http
            .get(self.url(&["calendars", calendar_id, "events", event_id]));
        self.send_json(req).await
    }

    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), Error> {
        let req = self
            .http
            .delete(self.url(&["calendars", calendar_id, "events", event_id]));
        self.send(req).await?;
        Ok(())
    }

    pub async fn list_events(
        &self,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<Vec<Event>, Error> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let req = self
                .http
                .get(self.url(&["calendars", calendar_id, "events"]))
                .query(&query.params(page_token.as_deref()));
            let page: EventsResponse = self.send_json(req).await?;
            events.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::auth::StaticToken;
    use mockito::Matcher;

    fn client(url: &str) -> GoogleCalendar {
        GoogleCalendar::new(url, Arc::new(StaticToken(String::from("test-token"))))
    }

    #[test]
    fn it_percent_encodes_path_segments() {
        let gcal = client("https://example.com/calendar/v3/");
        assert_eq!(
            gcal.url(&["calendars", "abc@group.calendar.google.com", "events"]),
            "https://example.com/calendar/v3/calendars/abc%40group.calendar.google.com/events"
        );
    }

    #[test]
    fn it_deserializes_events_without_optional_fields() {
        let json = r#"{"id": "evt1", "start": {"date": "2025-10-10"}, "end": {"date": "2025-10-11"}}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.id, "evt1");
        assert_eq!(event.summary, "");
        assert_eq!(event.start.date, Some("2025-10-10".to_string()));
        assert_eq!(event.start.date_time, None);
    }

    #[test]
    fn it_serializes_new_events_with_rfc3339_times() {
        let event = NewEvent {
            summary: String::from("João"),
            description: String::from("Consulta"),
            start: EventDateTime::from_rfc3339("2025-10-10T16:00:00-03:00"),
            end: EventDateTime::from_rfc3339("2025-10-10T17:00:00-03:00"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["start"]["dateTime"], "2025-10-10T16:00:00-03:00");
        assert!(json["start"].get("date").is_none());
    }

    #[tokio::test]
    async fn it_lists_calendars_across_pages() -> Result<()> {
        let mut server = mockito::Server::new_async().await;

        let page_two = server
            .mock("GET", "/users/me/calendarList")
            .match_query(Matcher::UrlEncoded("pageToken".into(), "p2".into()))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": [{"id": "cal2", "summary": "Ana"}]}"#)
            .create();
        let page_one = server
            .mock("GET", "/users/me/calendarList")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": [{"id": "cal1", "summary": "Maria"}], "nextPageToken": "p2"}"#)
            .create();

        let calendars = client(&server.url()).list_calendars().await?;

        page_one.assert();
        page_two.assert();
        assert_eq!(calendars.len(), 2);
        assert_eq!(calendars[0].summary, "Maria");
        assert_eq!(calendars[1].id, "cal2");
        Ok(())
    }

    #[tokio::test]
    async fn it_lists_single_events_ordered_by_start_time() -> Result<()> {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/calendars/cal1/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
                Matcher::UrlEncoded("singleEvents".into(), "true".into()),
                Matcher::UrlEncoded("q".into(), "João".into()),
                Matcher::UrlEncoded("timeMin".into(), "2025-10-10T00:00:00-03:00".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": [{"id": "evt1", "summary": "João", "start": {"dateTime": "2025-10-10T16:00:00-03:00"}, "end": {"dateTime": "2025-10-10T17:00:00-03:00"}}]}"#)
            .create();

        let query = EventQuery {
            keyword: Some(String::from("João")),
            time_min: Some(String::from("2025-10-10T00:00:00-03:00")),
            time_max: None,
        };
        let events = client(&server.url()).list_events("cal1", &query).await?;

        mock.assert();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "João");
        Ok(())
    }

    #[tokio::test]
    async fn it_surfaces_api_errors_with_status_and_body() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/calendars/missing")
            .with_status(404)
            .with_body(r#"{"error": {"code": 404, "message": "Not Found"}}"#)
            .create();

        let result = client(&server.url()).get_calendar("missing").await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("404"));
        assert!(err.contains("Not Found"));
    }

    #[tokio::test]
    async fn it_deletes_events() -> Result<()> {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("DELETE", "/calendars/cal1/events/evt1")
            .with_status(204)
            .create();

        client(&server.url()).delete_event("cal1", "evt1").await?;
        mock.assert();
        Ok(())
    }
}
