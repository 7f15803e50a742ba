pub mod client;
pub mod connector;
pub mod handoff;
pub mod types;
