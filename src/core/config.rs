use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub db_path: String,
    pub credentials_path: String,
    pub calendar_api_url: String,
    pub calendar_time_zone: String,
    // Every calendar created by the service gets a writer ACL for
    // this address so a human can see it in their own calendar UI
    pub share_calendars_with: Option<String>,
    pub enforce_policy: bool,
    pub openai_model: String,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("AGENDA_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/agenda.db", storage_path.trim_end_matches('/'));
        let credentials_path = env::var("AGENDA_CREDENTIALS_PATH")
            .unwrap_or_else(|_| format!("{}/credentials.json", storage_path.trim_end_matches('/')));
        let calendar_api_url = env::var("AGENDA_CALENDAR_API_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string());
        let calendar_time_zone = env::var("AGENDA_CALENDAR_TIME_ZONE")
            .unwrap_or_else(|_| "America/Sao_Paulo".to_string());
        let share_calendars_with = env::var("AGENDA_SHARE_CALENDARS_WITH")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let enforce_policy = env::var("AGENDA_ENFORCE_POLICY")
            .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);
        let openai_api_hostname = env::var("AGENDA_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("AGENDA_LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());

        Self {
            storage_path,
            db_path,
            credentials_path,
            calendar_api_url,
            calendar_time_zone,
            share_calendars_with,
            enforce_policy,
            openai_model,
            openai_api_hostname,
            openai_api_key,
        }
    }
}
