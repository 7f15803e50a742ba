pub mod kubernetes;
#[cfg(test)]
pub mod memory;
pub mod resources;
pub mod types;
