//! Integration tests for the chat API endpoint

mod test_utils;

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use mockito::Matcher;
    use tower::util::ServiceExt;

    use agenda::api::public::chat::ChatResponse;
    use agenda::openai::Role;

    use crate::test_utils::{body_to_string, content_response, test_app, tool_call_response};

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .uri("/chat")
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Asking for the next appointment when there is none walks
    /// through the calendar tools and answers NOT_FOUND
    #[tokio::test]
    async fn it_reports_no_upcoming_appointment() {
        let mut llm = mockito::Server::new_async().await;
        let mut calendar = mockito::Server::new_async().await;

        let _calendar_list = calendar
            .mock("GET", "/users/me/calendarList")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(fs::read_to_string("./tests/data/calendar_list_response.json").unwrap())
            .create();
        let _get_calendar = calendar
            .mock("GET", "/calendars/maria%40group.calendar.google.com")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "maria@group.calendar.google.com", "summary": "Maria"}"#)
            .create();
        let events = calendar
            .mock("GET", "/calendars/maria%40group.calendar.google.com/events")
            .match_query(Matcher::UrlEncoded("q".into(), "João".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": []}"#)
            .create();

        // The first turn sees the system prompt, the rendered user
        // message and the tool schema
        let find_calendar = llm
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-api-key")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({
                    "model": "gpt-test",
                    "messages": [{"role": "system"}, {"role": "user"}],
                    "tools": [{"type": "function", "function": {"name": "create_calendar"}}]
                })),
                Matcher::Regex(r#"\\"toClient\\": \\"Maria\\""#.to_string()),
                Matcher::Regex("Qual meu próximo compromisso?".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(tool_call_response(
                "call_1",
                "find_calendar_by_summary",
                serde_json::json!({"summary": "Maria"}),
            ))
            .create();
        let search_events = llm
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(tool_call_response(
                "call_2",
                "get_events_by_date_range_and_keyword",
                serde_json::json!({
                    "calendarId": "maria@group.calendar.google.com",
                    "start": "2025-10-09T12:00:00-03:00",
                    "end": "2026-10-09T12:00:00-03:00",
                    "keyword": "João"
                }),
            ))
            .create();
        let answer = llm
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::Regex(r#""tool_call_id":"call_2""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(content_response(
                r#"{"action": "NOT_FOUND", "message": "Você não tem nenhum compromisso agendado."}"#,
            ))
            .create();

        let (app, state) = test_app(&llm.url(), &calendar.url()).await;
        let response = app
            .oneshot(chat_request(serde_json::json!({
                "toClient": "Maria",
                "fromRequester": "João",
                "message": "Qual meu próximo compromisso?"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        find_calendar.assert();
        search_events.assert();
        answer.assert();
        events.assert();

        let body: ChatResponse =
            serde_json::from_str(&body_to_string(response.into_body()).await).unwrap();
        assert_eq!(body.to_client, "Maria");
        assert_eq!(body.from_requester, "João");
        assert!(body.content.contains("NOT_FOUND"));

        // Only the user prompt and the final answer are remembered
        let remembered = state.memory.get("Maria-João").await.unwrap();
        assert_eq!(remembered.len(), 2);
        assert_eq!(remembered[0].role(), &Role::User);
        assert_eq!(remembered[1].content, Some(body.content));
    }

    /// Deleting someone else's event is refused before it reaches
    /// the calendar API, and the model is told why
    #[tokio::test]
    async fn it_refuses_removing_another_requesters_event() {
        let mut llm = mockito::Server::new_async().await;
        let mut calendar = mockito::Server::new_async().await;

        let _get_event = calendar
            .mock("GET", "/calendars/cal1/events/evt1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": "evt1", "summary": "Ana", "start": {"dateTime": "2099-10-10T09:00:00-03:00"}, "end": {"dateTime": "2099-10-10T10:00:00-03:00"}}"#,
            )
            .create();
        let delete = calendar
            .mock("DELETE", "/calendars/cal1/events/evt1")
            .expect(0)
            .create();

        let _delete_call = llm
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(tool_call_response(
                "call_1",
                "delete_event",
                serde_json::json!({"calendarId": "cal1", "eventId": "evt1"}),
            ))
            .create();
        let explain = llm
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::Regex("Refused: event 'Ana'".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(content_response(
                r#"{"action": "NOT_FOUND", "message": "Já existe um evento agendado nesse horário."}"#,
            ))
            .create();

        let (app, _state) = test_app(&llm.url(), &calendar.url()).await;
        let response = app
            .oneshot(chat_request(serde_json::json!({
                "toClient": "Maria",
                "fromRequester": "João",
                "message": "Remova o evento evt1, já confirmei"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        explain.assert();
        delete.assert();
    }

    #[tokio::test]
    async fn it_rejects_requests_missing_fields() {
        let (app, _state) = test_app("http://localhost:1", "http://localhost:1").await;

        let response = app
            .oneshot(chat_request(serde_json::json!({
                "toClient": "Maria",
                "message": "Oi"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn it_fails_when_the_llm_is_down() {
        let mut llm = mockito::Server::new_async().await;
        let _mock = llm
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create();

        let (app, state) = test_app(&llm.url(), "http://localhost:1").await;
        let response = app
            .oneshot(chat_request(serde_json::json!({
                "toClient": "Maria",
                "fromRequester": "João",
                "message": "Oi"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_to_string(response.into_body()).await;
        assert!(body.starts_with("Something went wrong"));
        assert!(state.memory.get("Maria-João").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn it_only_serves_post() {
        let (app, _state) = test_app("http://localhost:1", "http://localhost:1").await;

        let response = app
            .oneshot(Request::builder().uri("/chat").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
