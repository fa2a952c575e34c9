pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod timeday;

pub use config::EngineConfig;
pub use engine::{Engine, EngineError, Violation};
