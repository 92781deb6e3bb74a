//! Error types for the network status monitor.

use std::path::PathBuf;

/// Result type alias for network status operations.
pub type Result<T> = std::result::Result<T, StatusError>;

/// Errors surfaced by the network status monitor.
///
/// Probe failures never appear here: the prober treats them as "unavailable".
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The OS change-notification subscription could not be established.
    ///
    /// Point-in-time availability still works, but no change notifications
    /// will be delivered.
    #[error("Failed to subscribe to network change notifications: {0}")]
    Subscription(String),

    /// The detector thread could not be spawned.
    #[error("Failed to spawn detector thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Querying the host's interfaces failed.
    #[error("Interface query failed: {0}")]
    Query(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file is not valid TOML for [`MonitorConfig`](crate::MonitorConfig).
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("Failed to read configuration '{path}': {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StatusError {
    /// Create a subscription error.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription(message.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Returns true if change detection could not be established.
    pub fn is_subscription(&self) -> bool {
        matches!(self, Self::Subscription(_))
    }
}
