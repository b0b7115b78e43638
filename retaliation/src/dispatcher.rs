//! The dispatch cache: one coordinator task owning the host → worker map.
//!
//! Nothing outside the coordinator task ever touches the map.  Producers talk
//! to it through a [`DispatchHandle`]; workers talk to it through the same
//! control channel when they retire.  Messages are processed strictly one at a
//! time, which is the only synchronisation the map needs.
//!
//! ## Submit/retire race
//!
//! A worker that hits its idle timeout closes its inbox *before* sending
//! `Retire`.  If a credential for that host is processed in between, the
//! coordinator sees the closed inbox and replaces the entry with a fresh
//! worker carrying a new [`WorkerId`].  When the stale `Retire` finally
//! arrives its id no longer matches and it is ignored, so the fresh worker
//! stays reachable.

use {
    crate::{
        config::{ConfigError, RetaliationConfig},
        credential::{Credential, CredentialEvent},
        error::{Result, RetaliationError},
        metrics::RetaliationMetrics,
        transport::Transport,
        worker::{HostWorker, WorkerContext, WorkerId},
    },
    log::{debug, info, warn},
    std::{collections::HashMap, sync::Arc},
    tokio::{
        sync::{
            mpsc::{self, error::TrySendError},
            oneshot,
        },
        task::JoinHandle,
    },
    tokio_util::sync::CancellationToken,
};

/// Requests served by the coordinator task.
#[derive(Debug)]
pub enum ControlMessage {
    /// Route a captured credential to the worker for its source host.
    Submit(CredentialEvent),
    /// A worker's own notice that it has stopped.
    Retire { host: String, worker_id: WorkerId },
    /// Report the hosts currently cached.
    ActiveHosts(oneshot::Sender<Vec<String>>),
}

struct WorkerEntry {
    id: WorkerId,
    inbox: mpsc::Sender<Credential>,
}

/// Coordinator state.  Lives inside the task started by [`DispatchCache::spawn`].
pub struct DispatchCache<T: Transport> {
    workers: HashMap<String, WorkerEntry>,
    next_worker_id: u64,
    control_rx: mpsc::Receiver<ControlMessage>,
    ctx: WorkerContext<T>,
}

impl<T: Transport> DispatchCache<T> {
    /// Validate `config` and start the coordinator task.
    ///
    /// Cancelling `cancel` (or calling [`DispatchHandle::shutdown`]) stops the
    /// coordinator and every worker it spawned.
    pub fn spawn(
        config: RetaliationConfig,
        transport: Arc<T>,
        metrics: Arc<RetaliationMetrics>,
        cancel: CancellationToken,
    ) -> std::result::Result<(DispatchHandle, JoinHandle<()>), ConfigError> {
        config.validate()?;

        let (control_tx, control_rx) = mpsc::channel(config.control_buffer_size);
        let handle = DispatchHandle {
            control_tx: control_tx.clone(),
            metrics: Arc::clone(&metrics),
            cancel: cancel.clone(),
        };
        let cache = Self {
            workers: HashMap::with_capacity(1024),
            next_worker_id: 0,
            control_rx,
            ctx: WorkerContext {
                control_tx,
                transport,
                config: Arc::new(config),
                metrics,
                cancel,
            },
        };
        Ok((handle, tokio::spawn(cache.run())))
    }

    async fn run(mut self) {
        info!("dispatch cache started");
        loop {
            tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => break,
                message = self.control_rx.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
            }
        }
        info!(
            "dispatch cache stopped with {} cached hosts",
            self.workers.len()
        );
    }

    fn handle(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Submit(event) => self.submit(event),
            ControlMessage::Retire { host, worker_id } => self.retire(host, worker_id),
            ControlMessage::ActiveHosts(reply) => {
                let mut hosts: Vec<String> = self.workers.keys().cloned().collect();
                hosts.sort();
                let _ = reply.send(hosts);
            }
        }
    }

    fn submit(&mut self, event: CredentialEvent) {
        let CredentialEvent {
            source_host,
            credential,
        } = event;

        let credential = match self.workers.get(&source_host) {
            Some(entry) => match entry.inbox.try_send(credential) {
                Ok(()) => {
                    self.ctx.metrics.credentials_accepted.inc();
                    return;
                }
                Err(TrySendError::Full(_)) => {
                    self.ctx.metrics.credentials_dropped.inc();
                    return;
                }
                Err(TrySendError::Closed(credential)) => {
                    debug!(
                        "worker {} for {} is retiring, starting a replacement",
                        entry.id, source_host
                    );
                    credential
                }
            },
            None => credential,
        };

        let inbox = self.spawn_worker(source_host);
        match inbox.try_send(credential) {
            Ok(()) => self.ctx.metrics.credentials_accepted.inc(),
            Err(_) => self.ctx.metrics.credentials_dropped.inc(),
        }
    }

    fn spawn_worker(&mut self, host: String) -> mpsc::Sender<Credential> {
        let id = WorkerId(self.next_worker_id);
        self.next_worker_id = self.next_worker_id.wrapping_add(1);

        let (inbox_tx, inbox_rx) = mpsc::channel(self.ctx.config.cred_backlog);
        let worker = HostWorker::new(id, host.clone(), inbox_rx, self.ctx.clone());
        info!("attacking new host {} (worker {})", host, id);
        tokio::spawn(worker.run());

        self.workers.insert(
            host,
            WorkerEntry {
                id,
                inbox: inbox_tx.clone(),
            },
        );
        self.ctx.metrics.workers_spawned.inc();
        self.ctx.metrics.active_workers.set(self.active_len());
        inbox_tx
    }

    fn retire(&mut self, host: String, worker_id: WorkerId) {
        match self.workers.get(&host) {
            Some(entry) if entry.id == worker_id => {
                self.workers.remove(&host);
                self.ctx.metrics.workers_removed.inc();
                self.ctx.metrics.active_workers.set(self.active_len());
                info!("removing {} from cache", host);
            }
            Some(entry) => debug!(
                "ignoring stale retire from worker {} for {} (current worker {})",
                worker_id, host, entry.id
            ),
            None => warn!("retire from worker {} for uncached host {}", worker_id, host),
        }
    }

    fn active_len(&self) -> i64 {
        i64::try_from(self.workers.len()).unwrap_or(i64::MAX)
    }
}

/// Cloneable front door to the dispatch cache.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    control_tx: mpsc::Sender<ControlMessage>,
    metrics: Arc<RetaliationMetrics>,
    cancel: CancellationToken,
}

impl DispatchHandle {
    /// Hand a captured credential to the cache.  Whether it is queued or
    /// dropped for backpressure is not reported back.
    ///
    /// Waits while the control channel is full, so a backlogged coordinator
    /// slows the caller down rather than losing the credential here.
    pub async fn submit(&self, event: CredentialEvent) {
        if self
            .control_tx
            .send(ControlMessage::Submit(event))
            .await
            .is_err()
        {
            debug!("dispatch cache closed, credential discarded");
        }
    }

    /// Hosts that currently have a worker, sorted.
    pub async fn active_hosts(&self) -> Result<Vec<String>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.control_tx
            .send(ControlMessage::ActiveHosts(reply_tx))
            .await
            .map_err(|_| RetaliationError::DispatcherClosed)?;
        reply_rx.await.map_err(|_| RetaliationError::DispatcherClosed)
    }

    pub fn metrics(&self) -> &Arc<RetaliationMetrics> {
        &self.metrics
    }

    /// Stop the coordinator and all workers.  In-flight attempts are not drained.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
