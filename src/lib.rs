pub mod archive;
pub mod config;
pub mod engine;
pub mod humanize;
pub mod observability;
pub mod queue;
pub mod worker;

pub use engine::{ArchiveEngine, EngineError};
