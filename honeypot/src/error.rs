//! Error types for the honeypot server.

use {crate::config::ConfigError, std::path::PathBuf, thiserror::Error};

#[derive(Error, Debug)]
pub enum HoneypotError {
    /// SSH protocol error from russh.
    #[error("ssh error: {0}")]
    Ssh(#[from] russh::Error),

    /// Listener or socket I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A host key file could not be loaded.
    #[error("unable to load host key {}: {reason}", path.display())]
    HostKey { path: PathBuf, reason: String },

    /// No host key was configured and generating one failed.
    #[error("unable to generate an ed25519 host key")]
    KeyGeneration,

    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, HoneypotError>;
