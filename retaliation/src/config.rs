//! Configuration for the retaliation dispatcher.

use {regex::Regex, std::time::Duration};

/// Banner advertised by default, both as server id and as retaliation client id.
pub const DEFAULT_BANNER: &str = "SSH-2.0-OpenSSH_6.1p2";

/// Well-known SSH port retaliation attempts connect to.
pub const DEFAULT_TARGET_PORT: u16 = 22;

/// Capacity of each host worker's inbox.
pub const CRED_BACKLOG: usize = 2048;

/// How long a worker waits for a new credential before retiring.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Consecutive network failures after which a worker stops connecting out.
pub const NET_FAILURE_THRESHOLD: u32 = 3;

const BANNER_PATTERN: &str = r"^SSH-2\.0-[[:alnum:]]+";

/// Configuration for the dispatch cache and its host workers.
#[derive(Debug, Clone)]
pub struct RetaliationConfig {
    /// Client version line sent when logging into an attacker.
    /// Must look like an SSH 2.0 identification string.
    pub banner: String,

    /// Port retaliation attempts connect to.
    pub target_port: u16,

    /// Per-host inbox capacity.  Credentials beyond this are dropped.
    pub cred_backlog: usize,

    /// Idle period after which a worker retires itself.
    pub idle_timeout: Duration,

    /// Consecutive connect failures that open the circuit breaker.
    pub failure_threshold: u32,

    /// Upper bound on establishing the outbound TCP connection.
    pub connect_timeout: Duration,

    /// Upper bound on the SSH handshake and password exchange.
    pub handshake_timeout: Duration,

    /// Buffer size of the coordinator's control channel.
    pub control_buffer_size: usize,
}

impl Default for RetaliationConfig {
    fn default() -> Self {
        Self {
            banner: DEFAULT_BANNER.to_string(),
            target_port: DEFAULT_TARGET_PORT,
            cred_backlog: CRED_BACKLOG,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            failure_threshold: NET_FAILURE_THRESHOLD,
            connect_timeout: Duration::from_secs(20),
            handshake_timeout: Duration::from_secs(30),
            control_buffer_size: 32,
        }
    }
}

impl RetaliationConfig {
    /// Create a config suitable for local testing with shorter timeouts.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            banner: DEFAULT_BANNER.to_string(),
            target_port: DEFAULT_TARGET_PORT,
            cred_backlog: CRED_BACKLOG,
            idle_timeout: Duration::from_secs(60 * 60),
            failure_threshold: NET_FAILURE_THRESHOLD,
            connect_timeout: Duration::from_millis(500),
            handshake_timeout: Duration::from_secs(2),
            control_buffer_size: 32,
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_banner(&self.banner)?;
        if self.cred_backlog == 0 {
            return Err(ConfigError::ZeroBacklog);
        }
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("idle_timeout"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("connect_timeout"));
        }
        if self.handshake_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("handshake_timeout"));
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.control_buffer_size == 0 {
            return Err(ConfigError::ZeroControlBuffer);
        }
        Ok(())
    }
}

/// Check that `banner` starts with `SSH-2.0-` followed by at least one
/// alphanumeric character.
pub fn validate_banner(banner: &str) -> Result<(), ConfigError> {
    let pattern = Regex::new(BANNER_PATTERN).map_err(|_| ConfigError::InvalidBanner(banner.into()))?;
    if pattern.is_match(banner) {
        Ok(())
    } else {
        Err(ConfigError::InvalidBanner(banner.to_string()))
    }
}

/// Errors in retaliation configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("SSH2 banner must start with SSH-2.0- and contain at least one additional character, got {0:?}")]
    InvalidBanner(String),
    #[error("cred_backlog must be > 0")]
    ZeroBacklog,
    #[error("{0} must be > 0")]
    ZeroDuration(&'static str),
    #[error("failure_threshold must be > 0")]
    ZeroFailureThreshold,
    #[error("control_buffer_size must be > 0")]
    ZeroControlBuffer,
}
