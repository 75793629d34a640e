//! Job and CPU-hour reports from a search analytics index

pub mod cli;
pub mod config;
pub mod logging;
pub mod services;
pub mod types;
