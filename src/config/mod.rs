// src/config/mod.rs

//! Configuration loading and validation for the agent.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate identifiers, sizes and artifact globs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{AgentSection, CmdConfig, ConfigFile, JobConfig, RawConfigFile, RetrySection};
