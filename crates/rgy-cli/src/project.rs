//! # Project Subcommand
//!
//! Reads a stored resource snapshot (JSON) and prints it as it effectively
//! is at an instant: grace periods closed, anniversaries rolled and lapsed
//! transfers approved. Nothing is written back.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use rgy_core::Timestamp;
use rgy_flows::{project, RegistryConfig, Resource};

/// Arguments for `rgy project`.
#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Stored resource snapshot (JSON).
    #[arg(long, value_name = "PATH")]
    pub resource: PathBuf,

    /// Instant to project to, e.g. `2001-06-01T00:00:00Z`. Defaults to now.
    #[arg(long, value_name = "TIMESTAMP")]
    pub at: Option<String>,
}

/// Execute the project subcommand.
pub fn run_project(args: &ProjectArgs, config: &RegistryConfig) -> Result<u8> {
    let now = match &args.at {
        Some(at) => Timestamp::parse(at).with_context(|| format!("invalid --at {at:?}"))?,
        None => Timestamp::now(),
    };
    let text = std::fs::read_to_string(&args.resource)
        .with_context(|| format!("failed to read {}", args.resource.display()))?;
    let stored: Resource = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a resource snapshot", args.resource.display()))?;
    tracing::debug!(resource = stored.name(), at = %now, "projecting");
    let projected = project(&stored, now, config);
    println!("{}", serde_json::to_string_pretty(&projected)?);
    Ok(0)
}
