mod config;
pub use config::AppConfig;
pub mod db;
mod logging;
pub use logging::init_tracing;
