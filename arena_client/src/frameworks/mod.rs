// Frameworks: configuration and runtime bootstrap.

pub mod client;
pub mod config;
