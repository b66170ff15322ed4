//! SQLite persistence and the approval workflow engine.

pub mod connection;
pub mod engine;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use engine::{ApprovalEngine, EngineError};
pub use fixtures::DemoSeedDataset;
