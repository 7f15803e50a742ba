pub mod manifest;
pub mod state;
pub mod types;
