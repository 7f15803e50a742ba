pub mod ledger;
pub mod publisher;
pub mod stats;
pub mod types;
