//! # Validate Subcommand
//!
//! Parses a registry configuration file and checks every TLD's constants
//! and schedules. Schedule validation happens while parsing, so a file that
//! loads is internally consistent.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use rgy_flows::config::duration_format;
use rgy_flows::{RegistryConfig, TldConfig};

/// Arguments for `rgy validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Registry configuration file (YAML).
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let config = match RegistryConfig::load(&args.path) {
        Ok(config) => config,
        Err(e) => {
            println!("FAIL {}: {e}", args.path.display());
            return Ok(1);
        }
    };
    tracing::info!(path = %args.path.display(), tlds = config.tlds.len(), "registry config loaded");
    println!("OK {}", args.path.display());
    print_tld("defaults", &config.defaults);
    for (name, tld) in &config.tlds {
        print_tld(name, tld);
    }
    Ok(0)
}

fn print_tld(name: &str, tld: &TldConfig) {
    println!(
        "  {name}: add {} renew {} auto-renew {} transfer {} (automatic after {}) redemption {} pending delete {}",
        duration_format::render(&tld.add_grace_length),
        duration_format::render(&tld.renew_grace_length),
        duration_format::render(&tld.auto_renew_grace_length),
        duration_format::render(&tld.transfer_grace_length),
        duration_format::render(&tld.automatic_transfer_length),
        duration_format::render(&tld.redemption_grace_length),
        duration_format::render(&tld.pending_delete_length),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn valid_file_passes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tlds:\n  tld:\n    redemption_grace_length: 30d").unwrap();
        let args = ValidateArgs {
            path: file.path().to_path_buf(),
        };
        assert_eq!(run_validate(&args).unwrap(), 0);
    }

    #[test]
    fn invalid_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "defaults:\n  add_grace_length: 5 days").unwrap();
        let args = ValidateArgs {
            path: file.path().to_path_buf(),
        };
        assert_eq!(run_validate(&args).unwrap(), 1);
    }
}
