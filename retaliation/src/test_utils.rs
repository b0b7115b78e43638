//! In-memory transport and helpers for exercising workers without a network.

use {
    crate::{
        credential::Credential,
        error::{Result, RetaliationError},
        transport::{join_host_port, LoginOutcome, Transport},
    },
    async_trait::async_trait,
    parking_lot::Mutex,
    std::{collections::VecDeque, io, sync::Arc, time::Duration},
    tokio::sync::Semaphore,
};

/// A login the transport was asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRecord {
    pub target: String,
    pub credential: Credential,
    pub banner: String,
}

#[derive(Debug, Default)]
struct Recorded {
    connect_script: VecDeque<bool>,
    connects_started: usize,
    connects: Vec<String>,
    logins: Vec<LoginRecord>,
}

/// Connection handed out by [`ScriptedTransport`].
#[derive(Debug)]
pub struct ScriptedConnection {
    pub target: String,
}

/// A [`Transport`] whose connect and login results are fixed up front.
///
/// Connect results come from the script first and then from the default;
/// every call is recorded for later inspection.
#[derive(Debug)]
pub struct ScriptedTransport {
    connect_default: bool,
    login: std::result::Result<LoginOutcome, ()>,
    gate: Option<Arc<Semaphore>>,
    recorded: Mutex<Recorded>,
}

impl ScriptedTransport {
    fn new(connect_default: bool, login: std::result::Result<LoginOutcome, ()>) -> Self {
        Self {
            connect_default,
            login,
            gate: None,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Connects, and every password works.
    pub fn accepting() -> Self {
        Self::new(true, Ok(LoginOutcome::Accepted))
    }

    /// Connects, and every password is rejected.
    pub fn rejecting() -> Self {
        Self::new(true, Ok(LoginOutcome::Rejected))
    }

    /// Never connects.
    pub fn unreachable() -> Self {
        Self::new(false, Ok(LoginOutcome::Rejected))
    }

    /// Connects, but the SSH handshake always fails.
    pub fn with_handshake_errors(mut self) -> Self {
        self.login = Err(());
        self
    }

    /// Results for the first connect calls, `true` meaning success.
    pub fn with_connect_script(self, script: impl IntoIterator<Item = bool>) -> Self {
        self.recorded.lock().connect_script = script.into_iter().collect();
        self
    }

    /// Every connect waits for one permit of `gate` before completing.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Connect calls that have begun, including ones parked on the gate.
    pub fn connects_started(&self) -> usize {
        self.recorded.lock().connects_started
    }

    /// Targets of completed connect calls, in order.
    pub fn connect_attempts(&self) -> Vec<String> {
        self.recorded.lock().connects.clone()
    }

    pub fn logins(&self) -> Vec<LoginRecord> {
        self.recorded.lock().logins.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Connection = ScriptedConnection;

    async fn connect(&self, host: &str, port: u16) -> Result<ScriptedConnection> {
        let target = join_host_port(host, port);
        {
            let mut recorded = self.recorded.lock();
            recorded.connects_started = recorded.connects_started.saturating_add(1);
        }
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let connected = {
            let mut recorded = self.recorded.lock();
            recorded.connects.push(target.clone());
            recorded
                .connect_script
                .pop_front()
                .unwrap_or(self.connect_default)
        };
        if connected {
            Ok(ScriptedConnection { target })
        } else {
            Err(RetaliationError::Connect {
                target,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })
        }
    }

    async fn login(
        &self,
        connection: ScriptedConnection,
        target: &str,
        credential: &Credential,
        banner: &str,
    ) -> Result<LoginOutcome> {
        assert_eq!(connection.target, target);
        self.recorded.lock().logins.push(LoginRecord {
            target: target.to_string(),
            credential: credential.clone(),
            banner: banner.to_string(),
        });
        self.login.map_err(|()| RetaliationError::Handshake {
            target: target.to_string(),
            reason: "scripted handshake failure".to_string(),
        })
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let poll = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.is_ok()
}
