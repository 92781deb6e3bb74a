//! Monitor configuration types.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, StatusError};
use crate::network_info::ProbePolicy;

/// Configuration for a [`NetworkStatus`](crate::NetworkStatus) service.
///
/// Can be built in code with the setter methods or loaded from TOML:
///
/// ```toml
/// debounce_ms = 250
/// max_delay_ms = 1500
/// thread_name = "netstatus-detector"
///
/// [probe]
/// include_tunnels = false
/// include_virtual = false
/// require_gateway = true
/// ignored_interfaces = ["docker0"]
/// ```
///
/// Missing keys keep their default values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Quiet period after the last raw OS event before the state is re-probed.
    #[serde(rename = "debounce_ms", deserialize_with = "millis::deserialize")]
    pub debounce: Duration,

    /// Upper bound on how long a continuous burst can postpone a re-probe,
    /// measured from the first raw event of the burst.
    #[serde(rename = "max_delay_ms", deserialize_with = "millis::deserialize")]
    pub max_delay: Duration,

    /// Name of the dedicated detector thread.
    pub thread_name: String,

    /// Rules deciding which interfaces count as a usable network path.
    pub probe: ProbePolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            max_delay: Duration::from_secs(2),
            thread_name: "netstatus-detector".to_string(),
            probe: ProbePolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| StatusError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Set the debounce window.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the maximum delay a burst may impose on a re-probe.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the detector thread name.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the probe policy.
    pub fn probe_policy(mut self, policy: ProbePolicy) -> Self {
        self.probe = policy;
        self
    }

    /// Check that the configuration values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.debounce.is_zero() {
            return Err(StatusError::invalid_config("debounce must be greater than zero"));
        }
        if self.debounce > self.max_delay {
            return Err(StatusError::invalid_config(format!(
                "debounce ({:?}) must not exceed max_delay ({:?})",
                self.debounce, self.max_delay
            )));
        }
        if self.thread_name.trim().is_empty() {
            return Err(StatusError::invalid_config("thread_name must not be empty"));
        }
        if self.thread_name.contains('\0') {
            return Err(StatusError::invalid_config(
                "thread_name must not contain NUL bytes",
            ));
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
