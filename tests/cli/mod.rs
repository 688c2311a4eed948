//! CLI Integration Test Modules

pub mod argument_parsing;
pub mod simulation;
pub mod toml_config;
