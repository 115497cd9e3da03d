mod policy;
mod service;

pub use policy::{PolicyViolation, RequestContext};
pub use service::ScheduleService;
