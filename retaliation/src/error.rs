//! Error types for the retaliation dispatcher.

use {std::time::Duration, thiserror::Error};

/// Errors raised while attempting a retaliation login.
///
/// None of these leave the host worker: they are logged and folded into the
/// circuit breaker or the metrics.
#[derive(Error, Debug)]
pub enum RetaliationError {
    /// The outbound TCP connection could not be established.
    #[error("unable to establish tcp connection to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// The outbound TCP connection did not complete in time.
    #[error("tcp connection to {target} timed out after {elapsed:?}")]
    ConnectTimeout { target: String, elapsed: Duration },

    /// The SSH handshake or password exchange failed at the protocol level.
    #[error("ssh handshake with {target} failed: {reason}")]
    Handshake { target: String, reason: String },

    /// The SSH handshake did not complete in time.
    #[error("ssh handshake with {target} timed out after {elapsed:?}")]
    HandshakeTimeout { target: String, elapsed: Duration },

    /// The dispatch cache task is no longer running.
    #[error("dispatch cache closed")]
    DispatcherClosed,
}

/// Convenience result type for retaliation operations.
pub type Result<T> = std::result::Result<T, RetaliationError>;
