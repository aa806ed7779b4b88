pub mod browser;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod downloads;
pub mod logging;
