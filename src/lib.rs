pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod registry;
pub mod relay;
