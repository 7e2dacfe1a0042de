use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Weekly resynchronization with the remote authority.
pub const DEFAULT_SYNC_PERIOD: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(30 * 60);

fn secs<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// Access-control settings, read from a TOML file:
///
/// ```toml
/// [sync]
/// period_secs = 604800
/// timeout_secs = 1800
///
/// [admission]
/// banned_logins = ["mallory"]
/// allowed_email_domains = ["example.com"]
/// allow_machine = false
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub sync: SyncConfig,
    pub admission: AdmissionConfig,
}

impl AccessConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: AccessConfig =
            toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.sync.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Age after which a principal or record is refreshed.
    #[serde(rename = "period_secs", deserialize_with = "secs")]
    pub period: Duration,
    /// Upper bound on a single background refresh.
    #[serde(rename = "timeout_secs", deserialize_with = "secs")]
    pub timeout: Duration,
}

impl SyncConfig {
    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::Config("sync timeout must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_SYNC_PERIOD,
            timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    pub banned_logins: Vec<String>,
    /// Empty admits any email domain.
    pub allowed_email_domains: Vec<String>,
    pub allow_machine: bool,
}

impl AdmissionConfig {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.banned_logins.is_empty() && self.allowed_email_domains.is_empty() && self.allow_machine
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            banned_logins: Vec::new(),
            allowed_email_domains: Vec::new(),
            allow_machine: true,
        }
    }
}
