mod core;
pub use self::core::*;

pub mod memory;
pub use memory::{ChatMemory, MEMORY_WINDOW};

pub mod models;
