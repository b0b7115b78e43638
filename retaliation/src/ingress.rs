//! The boundary between the SSH server and the dispatcher.
//!
//! The server calls into an [`IngressAdapter`] for every authentication attempt
//! it is about to reject.  The adapter logs the attempt and, for password
//! attempts only, decides whether it becomes a [`CredentialEvent`].  It never
//! influences the authentication result: the server rejects regardless.

use {
    crate::{
        credential::{canonical_host, Credential, CredentialEvent},
        dispatcher::DispatchHandle,
    },
    log::{debug, info},
    std::{
        collections::HashSet,
        net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    },
};

/// Hosts that are never retaliated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    hosts: HashSet<IpAddr>,
}

impl AllowList {
    pub fn new(hosts: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            hosts: hosts.into_iter().map(|ip| ip.to_canonical()).collect(),
        }
    }

    /// `127.0.0.1` and `::1`.
    pub fn loopback() -> Self {
        Self::new([
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
        ])
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.hosts.contains(&ip.to_canonical())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::loopback()
    }
}

/// What happened to an observed password attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressOutcome {
    /// Handed to the dispatch cache.
    Submitted,
    /// Retaliation is disabled; the attempt was only logged.
    Passive,
    /// The source host is allow-listed; the attempt was only logged.
    Protected,
}

#[derive(Debug, Clone)]
pub struct IngressAdapter {
    dispatcher: Option<DispatchHandle>,
    allow_list: AllowList,
}

impl IngressAdapter {
    /// Log attempts, never retaliate.
    pub fn passive() -> Self {
        Self {
            dispatcher: None,
            allow_list: AllowList::default(),
        }
    }

    /// Feed password attempts from hosts outside `allow_list` to `dispatcher`.
    pub fn retaliating(dispatcher: DispatchHandle, allow_list: AllowList) -> Self {
        Self {
            dispatcher: Some(dispatcher),
            allow_list,
        }
    }

    pub fn is_retaliating(&self) -> bool {
        self.dispatcher.is_some()
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Password authentication observed from `peer`.
    pub async fn password_attempt(
        &self,
        peer: SocketAddr,
        client_banner: Option<&str>,
        user: &str,
        secret: &str,
    ) -> IngressOutcome {
        let ip = peer.ip().to_canonical();
        info!(
            "Attacker {} ({}) password auth - {} : {}",
            ip,
            client_banner.unwrap_or("unknown client"),
            user,
            secret
        );

        let Some(dispatcher) = &self.dispatcher else {
            return IngressOutcome::Passive;
        };
        if self.allow_list.contains(&ip) {
            debug!("{} is allow-listed, not retaliating", ip);
            return IngressOutcome::Protected;
        }

        let event = CredentialEvent::new(canonical_host(ip), Credential::new(user, secret));
        dispatcher.submit(event).await;
        IngressOutcome::Submitted
    }

    /// Public-key authentication observed from `peer`.  Logged only: a key
    /// offer carries no secret that could be replayed.
    pub fn publickey_attempt(
        &self,
        peer: SocketAddr,
        client_banner: Option<&str>,
        user: &str,
        key_type: &str,
        fingerprint: &str,
    ) {
        info!(
            "Attacker {} ({}) pubkey auth - {} : {} {}",
            peer.ip().to_canonical(),
            client_banner.unwrap_or("unknown client"),
            user,
            key_type,
            fingerprint
        );
    }
}
