pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod loader;
pub mod locator;
pub mod logging;
pub mod mappers;
pub mod normalize;
pub mod pipeline;
pub mod types;

// Ports the pipeline depends on, and their concrete adapters
pub mod app;
pub mod infra;
