//! # Registry Configuration
//!
//! Per-TLD constants that drive grace periods, transfers and pricing, loaded
//! from YAML. Configuration is an explicit value handed to every operation;
//! nothing here is global.
//!
//! ```yaml
//! defaults:
//!   add_grace_length: 5d
//! contact_automatic_transfer_length: 5d
//! max_contention_retries: 3
//! tlds:
//!   tld:
//!     redemption_grace_length: 30d
//!     create_cost_schedule:
//!       - ["1970-01-01T00:00:00Z", { currency: USD, minor_units: 1300 }]
//! ```
//!
//! Every field is optional. A TLD entry that omits a field gets the built-in
//! default, not the value from `defaults`; `defaults` applies only to TLDs
//! that have no entry at all, and only on the read path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rgy_core::Money;
use rgy_state::{FeeSchedule, TldState, TldStateSchedule};

use crate::error::FlowError;

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The YAML is malformed or has invalid values.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range.
    #[error("invalid config for {scope}: {reason}")]
    Invalid {
        /// `defaults` or the TLD name.
        scope: String,
        /// What is wrong.
        reason: String,
    },
}

/// Constants for one TLD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TldConfig {
    /// How long a transfer stays pending before automatic approval.
    #[serde(with = "duration_format")]
    pub automatic_transfer_length: Duration,
    /// Grace after create.
    #[serde(with = "duration_format")]
    pub add_grace_length: Duration,
    /// Grace after explicit renew.
    #[serde(with = "duration_format")]
    pub renew_grace_length: Duration,
    /// Grace after each auto-renew anniversary.
    #[serde(with = "duration_format")]
    pub auto_renew_grace_length: Duration,
    /// Grace after an approved transfer.
    #[serde(with = "duration_format")]
    pub transfer_grace_length: Duration,
    /// Redemption window after a delete.
    #[serde(with = "duration_format")]
    pub redemption_grace_length: Duration,
    /// Pending-delete window after redemption.
    #[serde(with = "duration_format")]
    pub pending_delete_length: Duration,
    /// Most years a transfer may add.
    pub max_transfer_extension_years: u32,
    /// Most years a registration may run ahead of now.
    pub max_registration_years: u32,
    /// Launch phases.
    pub tld_state_schedule: TldStateSchedule,
    /// Per-year create price.
    pub create_cost_schedule: FeeSchedule,
    /// Per-year renew price, also used for transfers.
    pub renew_cost_schedule: FeeSchedule,
    /// Flat restore fee.
    pub restore_cost: Money,
    /// Flat fee for a registry-applied status change.
    pub server_status_change_cost: Money,
}

fn usd(minor_units: i64) -> Money {
    Money {
        currency: "USD".to_string(),
        minor_units,
    }
}

impl Default for TldConfig {
    fn default() -> Self {
        Self {
            automatic_transfer_length: Duration::days(5),
            add_grace_length: Duration::days(5),
            renew_grace_length: Duration::days(5),
            auto_renew_grace_length: Duration::days(45),
            transfer_grace_length: Duration::days(5),
            redemption_grace_length: Duration::days(30),
            pending_delete_length: Duration::days(5),
            max_transfer_extension_years: 1,
            max_registration_years: 10,
            tld_state_schedule: TldStateSchedule::constant(TldState::GeneralAvailability),
            create_cost_schedule: FeeSchedule::constant(usd(1300)),
            renew_cost_schedule: FeeSchedule::constant(usd(1100)),
            restore_cost: usd(1700),
            server_status_change_cost: usd(2000),
        }
    }
}

impl TldConfig {
    fn validate(&self, scope: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            scope: scope.to_string(),
            reason,
        };
        let lengths = [
            ("automatic_transfer_length", self.automatic_transfer_length),
            ("add_grace_length", self.add_grace_length),
            ("renew_grace_length", self.renew_grace_length),
            ("auto_renew_grace_length", self.auto_renew_grace_length),
            ("transfer_grace_length", self.transfer_grace_length),
            ("redemption_grace_length", self.redemption_grace_length),
            ("pending_delete_length", self.pending_delete_length),
        ];
        for (name, length) in lengths {
            if length <= Duration::zero() {
                return Err(invalid(format!("{name} must be positive")));
            }
        }
        if self.max_transfer_extension_years == 0 {
            return Err(invalid("max_transfer_extension_years must be at least 1".to_string()));
        }
        if self.max_registration_years == 0 {
            return Err(invalid("max_registration_years must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// The whole registry's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Used by the resolver for TLDs without an entry.
    pub defaults: TldConfig,
    /// Configured TLDs. Mutating operations require an entry.
    pub tlds: BTreeMap<String, TldConfig>,
    /// Pending window for contact transfers.
    #[serde(with = "duration_format")]
    pub contact_automatic_transfer_length: Duration,
    /// Retries after contention before giving up.
    pub max_contention_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            defaults: TldConfig::default(),
            tlds: BTreeMap::new(),
            contact_automatic_transfer_length: Duration::days(5),
            max_contention_retries: 3,
        }
    }
}

impl RegistryConfig {
    /// A configuration with the given TLDs, each on default constants.
    pub fn with_tlds<'a>(tlds: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            tlds: tlds
                .into_iter()
                .map(|tld| (tld.to_string(), TldConfig::default()))
                .collect(),
            ..Self::default()
        }
    }

    /// Parse and validate YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Check every range constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate("defaults")?;
        for (tld, config) in &self.tlds {
            config.validate(tld)?;
        }
        if self.contact_automatic_transfer_length <= Duration::zero() {
            return Err(ConfigError::Invalid {
                scope: "registry".to_string(),
                reason: "contact_automatic_transfer_length must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Constants of a configured TLD.
    pub fn tld(&self, tld: &str) -> Result<&TldConfig, FlowError> {
        self.tlds.get(tld).ok_or_else(|| FlowError::UnknownTld {
            tld: tld.to_string(),
        })
    }

    /// Constants of `tld`, or `defaults` when it is not configured.
    pub fn tld_or_default(&self, tld: &str) -> &TldConfig {
        self.tlds.get(tld).unwrap_or(&self.defaults)
    }
}

/// `"5d"`, `"12h"`, `"30m"` and `"90s"` durations.
pub mod duration_format {
    use chrono::Duration;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Parse a duration string.
    pub fn parse(text: &str) -> Result<Duration, String> {
        let text = text.trim();
        let split = text
            .char_indices()
            .last()
            .map(|(idx, _)| idx)
            .ok_or_else(|| "empty duration".to_string())?;
        let (number, unit) = text.split_at(split);
        let amount: i64 = number
            .parse()
            .map_err(|_| format!("invalid duration {text:?}: expected a whole number and a unit"))?;
        let duration = match unit {
            "d" => Duration::try_days(amount),
            "h" => Duration::try_hours(amount),
            "m" => Duration::try_minutes(amount),
            "s" => Duration::try_seconds(amount),
            _ => return Err(format!("invalid duration unit in {text:?}: use d, h, m or s")),
        };
        duration.ok_or_else(|| format!("duration {text:?} is out of range"))
    }

    /// Render a duration in the largest exact unit.
    pub fn render(duration: &Duration) -> String {
        let secs = duration.num_seconds();
        if secs != 0 && secs % 86_400 == 0 {
            format!("{}d", secs / 86_400)
        } else if secs != 0 && secs % 3_600 == 0 {
            format!("{}h", secs / 3_600)
        } else if secs != 0 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{secs}s")
        }
    }

    /// Serialize as a duration string.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&render(duration))
    }

    /// Deserialize from a duration string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(D::Error::custom)
    }
}
