//! atsshd honeypot SSH server
//!
//! Accepts SSH connections, records every authentication attempt through an
//! [`atsshd_retaliation::IngressAdapter`] and rejects all of them.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]   | `HoneypotConfig` defaults and validation |
//! | [`host_key`] | Loading or generating the server's host keys |
//! | [`server`]   | Accept loop and the per-connection russh handler |
//! | [`error`]    | Crate-wide error enum |

pub mod config;
pub mod error;
pub mod host_key;
pub mod server;

pub use {
    config::HoneypotConfig,
    error::{HoneypotError, Result},
    host_key::load_host_keys,
    server::{HoneypotHandle, HoneypotServer},
};
