pub mod commands;
pub mod config;
pub mod loader;
pub mod package;
pub mod runtime;
pub mod system;
