use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::ai::chat::ChatMemory;
use crate::core::AppConfig;
use crate::schedule::ScheduleService;

pub struct AppState {
    pub config: AppConfig,
    pub schedule: Arc<ScheduleService>,
    pub memory: ChatMemory,
}

impl AppState {
    pub fn new(db: Connection, config: AppConfig, schedule: ScheduleService) -> Self {
        Self {
            config,
            schedule: Arc::new(schedule),
            memory: ChatMemory::new(db),
        }
    }
}
