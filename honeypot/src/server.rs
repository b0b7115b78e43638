//! The SSH listener.
//!
//! Every connection gets its own task running a russh server session whose
//! handler reports each authentication attempt to the [`IngressAdapter`] and
//! then rejects it.  Nobody ever gets a shell.

use {
    crate::{config::HoneypotConfig, error::Result},
    async_trait::async_trait,
    atsshd_retaliation::IngressAdapter,
    log::{debug, error, info},
    russh::{
        server::{self, Auth},
        SshId,
    },
    russh_keys::key::{KeyPair, PublicKey},
    std::{net::SocketAddr, sync::Arc, time::Duration},
    tokio::{
        net::{TcpListener, TcpStream},
        task::JoinHandle,
        time::{sleep, timeout},
    },
    tokio_util::sync::CancellationToken,
};

const BANNER_PEEK_LEN: usize = 256;

/// Handle to a running listener.
pub struct HoneypotHandle {
    /// The address actually bound (useful when port = 0).
    pub local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl HoneypotHandle {
    /// Wait for the accept loop to exit after its token is cancelled.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("honeypot accept loop panicked: {}", e);
        }
    }
}

pub struct HoneypotServer {
    config: HoneypotConfig,
    ssh_config: Arc<server::Config>,
    ingress: Arc<IngressAdapter>,
}

impl HoneypotServer {
    /// Validate `config` and prepare a server presenting `keys`.
    pub fn new(
        config: HoneypotConfig,
        keys: Vec<KeyPair>,
        ingress: Arc<IngressAdapter>,
    ) -> Result<Self> {
        config.validate()?;
        let ssh_config = Arc::new(server::Config {
            server_id: SshId::Standard(config.banner.clone()),
            keys,
            auth_rejection_time: config.auth_rejection_time,
            inactivity_timeout: Some(config.inactivity_timeout),
            ..server::Config::default()
        });
        Ok(Self {
            config,
            ssh_config,
            ingress,
        })
    }

    /// Bind and start accepting connections until `cancel` fires.
    pub async fn bind(self, cancel: CancellationToken) -> Result<HoneypotHandle> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Listening for SSH connections on: {}", local_addr);

        let task = tokio::spawn(self.accept_loop(listener, cancel));
        Ok(HoneypotHandle { local_addr, task })
    }

    async fn accept_loop(self, listener: TcpListener, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(serve_connection(
                            stream,
                            peer,
                            Arc::clone(&self.ssh_config),
                            Arc::clone(&self.ingress),
                            self.config.banner_peek_timeout,
                            cancel.child_token(),
                        ));
                    }
                    Err(e) => {
                        // Usually fd exhaustion; spinning would only make it worse.
                        error!("accept error: {}", e);
                        sleep(self.config.accept_error_backoff).await;
                    }
                },
            }
        }
        if let Ok(addr) = listener.local_addr() {
            info!("honeypot listener on {} stopped", addr);
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ssh_config: Arc<server::Config>,
    ingress: Arc<IngressAdapter>,
    peek_timeout: Duration,
    cancel: CancellationToken,
) {
    info!("Attacker connection from: {}", peer);
    let client_banner = peek_client_banner(&stream, peek_timeout).await;
    let handler = AttackerSession {
        peer,
        client_banner,
        ingress,
    };

    match server::run_stream(ssh_config, stream, handler).await {
        Ok(session) => tokio::select! {
            _ = cancel.cancelled() => debug!("dropping session with {} on shutdown", peer),
            result = session => {
                if let Err(e) = result {
                    debug!("session with {} ended: {}", peer, e);
                }
            }
        },
        Err(e) => debug!("handshake with {} failed: {}", peer, e),
    }
    info!("Closed connection from: {}", peer);
}

/// Read, without consuming, the client's identification line.
async fn peek_client_banner(stream: &TcpStream, wait: Duration) -> Option<String> {
    let mut buf = [0u8; BANNER_PEEK_LEN];
    let peek = async {
        loop {
            let n = stream.peek(&mut buf).await.ok()?;
            if n == 0 {
                return None;
            }
            if n == buf.len() || buf[..n].contains(&b'\n') {
                return Some(n);
            }
            sleep(Duration::from_millis(10)).await;
        }
    };
    let len = timeout(wait, peek).await.ok().flatten()?;
    parse_client_banner(&buf[..len])
}

/// The first line of `bytes` if it is an SSH identification string.
pub fn parse_client_banner(bytes: &[u8]) -> Option<String> {
    let line = bytes.split(|b| *b == b'\n').next()?;
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches('\r');
    line.starts_with("SSH-").then(|| line.to_string())
}

/// Per-connection russh handler.  Every method rejects.
struct AttackerSession {
    peer: SocketAddr,
    client_banner: Option<String>,
    ingress: Arc<IngressAdapter>,
}

fn reject() -> Auth {
    Auth::Reject {
        proceed_with_methods: None,
    }
}

#[async_trait]
impl server::Handler for AttackerSession {
    type Error = russh::Error;

    async fn auth_password(
        &mut self,
        user: &str,
        password: &str,
    ) -> std::result::Result<Auth, Self::Error> {
        self.ingress
            .password_attempt(self.peer, self.client_banner.as_deref(), user, password)
            .await;
        Ok(reject())
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> std::result::Result<Auth, Self::Error> {
        self.ingress.publickey_attempt(
            self.peer,
            self.client_banner.as_deref(),
            user,
            public_key.name(),
            &public_key.fingerprint(),
        );
        Ok(reject())
    }
}
