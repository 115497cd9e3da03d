pub mod scheduler;
pub use scheduler::scheduling_response;
