//! # rgy-cli: Registry Command Line
//!
//! Subcommand handlers for the `rgy` binary. Each returns a process exit
//! code: 0 on success, 1 when the input was rejected. Operational failures
//! propagate as `anyhow::Error`.

pub mod project;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};

use rgy_flows::RegistryConfig;

/// Load `path`, or the built-in defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<RegistryConfig> {
    match path {
        Some(path) => RegistryConfig::load(path)
            .with_context(|| format!("failed to load registry config {}", path.display())),
        None => Ok(RegistryConfig::default()),
    }
}
