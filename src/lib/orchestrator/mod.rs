pub mod orchestrator;
pub mod saga;
pub mod types;
