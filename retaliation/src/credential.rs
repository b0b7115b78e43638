//! Captured credentials and the events that carry them into the dispatcher.

use std::{fmt, net::IpAddr};

/// A username/secret pair offered by a connecting client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    user: String,
    secret: String,
}

impl Credential {
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.secret)
    }
}

/// One observed password attempt, addressed to the host it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEvent {
    /// Attacker address, host only.
    pub source_host: String,
    /// What the attacker offered.
    pub credential: Credential,
}

impl CredentialEvent {
    pub fn new(source_host: impl Into<String>, credential: Credential) -> Self {
        Self {
            source_host: source_host.into(),
            credential,
        }
    }

    /// Build an event from a peer IP, folding IPv4-mapped IPv6 addresses
    /// back to plain IPv4 so both spellings share one worker.
    pub fn from_peer(ip: IpAddr, credential: Credential) -> Self {
        Self::new(canonical_host(ip), credential)
    }
}

/// Host-only textual form of a peer address.
pub fn canonical_host(ip: IpAddr) -> String {
    ip.to_canonical().to_string()
}
