//! Configuration for the honeypot SSH server.

use {
    atsshd_retaliation::config::{validate_banner, ConfigError as BannerError, DEFAULT_BANNER},
    std::{
        net::{Ipv4Addr, SocketAddr},
        path::PathBuf,
        time::Duration,
    },
};

/// Port the honeypot listens on unless told otherwise.
pub const DEFAULT_LISTEN_PORT: u16 = 22;

/// Configuration for [`crate::HoneypotServer`].
#[derive(Debug, Clone)]
pub struct HoneypotConfig {
    /// Address to accept SSH connections on.
    pub bind_addr: SocketAddr,

    /// Server identification string sent to every client.
    pub banner: String,

    /// Private key files to serve.  An ed25519 key is generated when empty.
    pub host_key_files: Vec<PathBuf>,

    /// Delay before every authentication rejection.
    pub auth_rejection_time: Duration,

    /// How long to wait for the client's identification line before the
    /// handshake starts without it.  The server's own identification is sent
    /// only after this wait, so a client that speaks second sees its banner
    /// delayed by up to this long.
    pub banner_peek_timeout: Duration,

    /// Idle connections are closed after this long.
    pub inactivity_timeout: Duration,

    /// Pause after a failed `accept()` before trying again.
    pub accept_error_backoff: Duration,
}

impl Default for HoneypotConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_LISTEN_PORT)),
            banner: DEFAULT_BANNER.to_string(),
            host_key_files: Vec::new(),
            auth_rejection_time: Duration::from_secs(1),
            banner_peek_timeout: Duration::from_secs(2),
            inactivity_timeout: Duration::from_secs(5 * 60),
            accept_error_backoff: Duration::from_millis(100),
        }
    }
}

impl HoneypotConfig {
    /// Create a config suitable for local testing: loopback, ephemeral port,
    /// no rejection delay.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            banner: DEFAULT_BANNER.to_string(),
            host_key_files: Vec::new(),
            auth_rejection_time: Duration::ZERO,
            banner_peek_timeout: Duration::from_millis(200),
            inactivity_timeout: Duration::from_secs(10),
            accept_error_backoff: Duration::from_millis(10),
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_banner(&self.banner).map_err(ConfigError::Banner)?;
        if self.banner_peek_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("banner_peek_timeout"));
        }
        if self.inactivity_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("inactivity_timeout"));
        }
        Ok(())
    }
}

/// Errors in honeypot configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Banner(BannerError),
    #[error("{0} must be > 0")]
    ZeroDuration(&'static str),
}
