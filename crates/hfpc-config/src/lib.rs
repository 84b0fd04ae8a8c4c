//! Configuration management for the HFP client stack
//!
//! This crate provides configuration loading and parsing:
//! - TOML configuration file parsing
//! - Stack configuration structures
//! - Shared mutable stack state

pub mod stack_config;
pub mod toml_config;

pub use stack_config::*;
pub use toml_config::*;
