pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use commands::App;
pub use config::{load_config, Config, LoadedConfig, Settings};
