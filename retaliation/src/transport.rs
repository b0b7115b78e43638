//! Outbound connections used by host workers.
//!
//! A retaliation attempt has two phases, and the worker treats their failures
//! differently:
//!
//! 1. [`Transport::connect`]: plain TCP.  A failure here is a *network*
//!    failure and feeds the circuit breaker.
//! 2. [`Transport::login`]: SSH handshake plus one password authentication on
//!    the connection from phase 1.  A failure here is routine.
//!
//! [`SshTransport`] is the production implementation built on `russh`.  Both
//! phases are bounded by the timeouts in [`RetaliationConfig`] so a black-holed
//! host cannot park its worker forever.

use {
    crate::{
        config::RetaliationConfig,
        credential::Credential,
        error::{Result, RetaliationError},
    },
    async_trait::async_trait,
    log::debug,
    russh::{client, Disconnect, SshId},
    russh_keys::key,
    std::{net::IpAddr, sync::Arc, time::Duration},
    tokio::{net::TcpStream, time::timeout},
};

/// Result of a password login that completed the SSH handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The remote host accepted the credential.
    Accepted,
    /// The remote host rejected the credential.
    Rejected,
}

/// How a host worker reaches its target.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// An established transport connection, consumed by [`Transport::login`].
    type Connection: Send;

    /// Open a plain transport connection to `host:port`.
    async fn connect(&self, host: &str, port: u16) -> Result<Self::Connection>;

    /// Run the SSH handshake over `connection`, advertising `banner` as the
    /// client version, and try a single password login.  The connection is
    /// closed when this returns, whatever the outcome.
    async fn login(
        &self,
        connection: Self::Connection,
        target: &str,
        credential: &Credential,
        banner: &str,
    ) -> Result<LoginOutcome>;
}

/// Format `host:port`, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(_)) => format!("[{host}]:{port}"),
        _ => format!("{host}:{port}"),
    }
}

/// Attacker host keys are never verified: we only care whether the password
/// is accepted.
struct AcceptAnyHostKey;

#[async_trait]
impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        debug!("accepting {} host key", server_public_key.name());
        Ok(true)
    }
}

/// Production transport: TCP via tokio, SSH via russh.
#[derive(Debug, Clone)]
pub struct SshTransport {
    connect_timeout: Duration,
    handshake_timeout: Duration,
}

impl SshTransport {
    pub fn new(config: &RetaliationConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            handshake_timeout: config.handshake_timeout,
        }
    }

    fn client_config(&self, banner: &str) -> Arc<client::Config> {
        Arc::new(client::Config {
            client_id: SshId::Standard(banner.to_string()),
            inactivity_timeout: Some(self.handshake_timeout),
            ..client::Config::default()
        })
    }
}

#[async_trait]
impl Transport for SshTransport {
    type Connection = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        let target = join_host_port(host, port);
        match timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(RetaliationError::Connect { target, source }),
            Err(_) => Err(RetaliationError::ConnectTimeout {
                target,
                elapsed: self.connect_timeout,
            }),
        }
    }

    async fn login(
        &self,
        connection: TcpStream,
        target: &str,
        credential: &Credential,
        banner: &str,
    ) -> Result<LoginOutcome> {
        let config = self.client_config(banner);
        let exchange = async {
            let mut session = client::connect_stream(config, connection, AcceptAnyHostKey).await?;
            let accepted = session
                .authenticate_password(credential.user(), credential.secret())
                .await?;
            if let Err(e) = session
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
            {
                debug!("disconnect from {} failed: {}", target, e);
            }
            Ok::<bool, russh::Error>(accepted)
        };

        match timeout(self.handshake_timeout, exchange).await {
            Ok(Ok(true)) => Ok(LoginOutcome::Accepted),
            Ok(Ok(false)) => Ok(LoginOutcome::Rejected),
            Ok(Err(e)) => Err(RetaliationError::Handshake {
                target: target.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(RetaliationError::HandshakeTimeout {
                target: target.to_string(),
                elapsed: self.handshake_timeout,
            }),
        }
    }
}
