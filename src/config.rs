//! Configuration for the dispatch subsystem.
//!
//! The root prefix and the correlation timeout are product decisions, so both
//! live here instead of being baked into the protocol code.

use std::time::Duration;

use crate::error::ConfigError;

/// Default namespace prefix.
pub const DEFAULT_ROOT_PREFIX: &str = "root.";

/// Default bound for correlated requests.
pub const DEFAULT_CORRELATION_TIMEOUT: Duration = Duration::from_millis(2500);

/// Default per-subscriber notification channel capacity.
pub const DEFAULT_NOTIFICATION_BUFFER: usize = 64;

/// Base trait for configuration types.
///
/// # Example
///
/// ```rust
/// use framecall::Config;
/// use std::time::Duration;
///
/// struct ShortTimeouts;
///
/// impl Config for ShortTimeouts {
///     fn timeout(&self) -> Option<Duration> {
///         Some(Duration::from_millis(500))
///     }
/// }
///
/// assert!(ShortTimeouts.validate().is_ok());
/// ```
pub trait Config: Send + Sync {
    /// Returns the configuration name/identifier.
    fn name(&self) -> &str {
        "default"
    }

    /// Returns the timeout duration, if configured.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Returns whether verbose output is enabled.
    fn is_verbose(&self) -> bool {
        false
    }

    /// Returns whether debug mode is enabled.
    fn is_debug(&self) -> bool {
        false
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Settings for a [`Dispatcher`](crate::Dispatcher) and the components it owns.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Configuration name
    pub name: String,
    /// Every namespace key must start with this
    pub root_prefix: String,
    /// How long a correlated request waits before using its safe default
    pub correlation_timeout: Duration,
    /// Capacity of each notification subscriber's channel
    pub notification_buffer: usize,
    /// Verbose output flag
    pub verbose: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
            correlation_timeout: DEFAULT_CORRELATION_TIMEOUT,
            notification_buffer: DEFAULT_NOTIFICATION_BUFFER,
            verbose: false,
        }
    }
}

impl RpcConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the mandated namespace prefix.
    pub fn with_root_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.root_prefix = prefix.into();
        self
    }

    /// Set the correlation timeout.
    pub fn with_correlation_timeout(mut self, timeout: Duration) -> Self {
        self.correlation_timeout = timeout;
        self
    }

    /// Set the correlation timeout in milliseconds.
    pub fn with_correlation_timeout_ms(mut self, ms: u64) -> Self {
        self.correlation_timeout = Duration::from_millis(ms);
        self
    }

    /// Set the notification channel capacity.
    pub fn with_notification_buffer(mut self, size: usize) -> Self {
        self.notification_buffer = size;
        self
    }

    /// Enable verbose output.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl Config for RpcConfig {
    fn name(&self) -> &str {
        if self.name.is_empty() {
            "default"
        } else {
            &self.name
        }
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.correlation_timeout)
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.root_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.correlation_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.notification_buffer == 0 {
            return Err(ConfigError::ZeroBuffer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RpcConfig::new();

        assert_eq!(config.name(), "default");
        assert_eq!(config.root_prefix, "root.");
        assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
        assert!(!config.is_verbose());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = RpcConfig::new()
            .with_name("shell")
            .with_root_prefix("shell.")
            .with_correlation_timeout_ms(800)
            .with_notification_buffer(8)
            .verbose();

        assert_eq!(config.name(), "shell");
        assert_eq!(config.root_prefix, "shell.");
        assert_eq!(config.correlation_timeout, Duration::from_millis(800));
        assert_eq!(config.notification_buffer, 8);
        assert!(config.is_verbose());
    }

    #[test]
    fn test_config_validation() {
        let empty_prefix = RpcConfig::new().with_root_prefix("");
        assert_eq!(empty_prefix.validate(), Err(ConfigError::EmptyPrefix));

        let zero_timeout = RpcConfig::new().with_correlation_timeout(Duration::ZERO);
        assert_eq!(zero_timeout.validate(), Err(ConfigError::ZeroTimeout));

        let zero_buffer = RpcConfig::new().with_notification_buffer(0);
        assert_eq!(zero_buffer.validate(), Err(ConfigError::ZeroBuffer));
    }
}
