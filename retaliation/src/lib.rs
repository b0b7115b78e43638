//! atsshd retaliation dispatcher
//!
//! Every password captured by the honeypot can be replayed against the host
//! that offered it.  This crate owns that pipeline:
//!
//! - **Ingress**: decides whether an observed login attempt becomes a
//!   [`CredentialEvent`] (retaliation enabled, host not allow-listed).
//! - **Dispatch cache**: one coordinator task mapping each attacking host to
//!   the inbox of its worker.  Workers are created lazily and removed only when
//!   they report their own idle timeout.
//! - **Host workers**: one task per attacking host that drains a bounded inbox
//!   serially, trips a circuit breaker after repeated network failures and
//!   retires itself after a quiet period.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────────────────────────┐
//!  │  SSH server (atsshd-honeypot)│
//!  └──────────────┬───────────────┘
//!                 │ password_attempt()
//!  ┌──────────────▼───────────────┐
//!  │  IngressAdapter              │  allow-list, attack-mode flag
//!  └──────────────┬───────────────┘
//!                 │ ControlMessage::Submit
//!  ┌──────────────▼───────────────┐
//!  │  DispatchCache (one task)    │  host → {WorkerId, inbox}
//!  └───────┬──────────────▲───────┘
//!          │ try_send     │ ControlMessage::Retire
//!  ┌───────▼──────────────┴───────┐
//!  │  HostWorker (task per host)  │  breaker, idle timer
//!  └──────────────┬───────────────┘
//!                 │ connect() / login()
//!  ┌──────────────▼───────────────┐
//!  │  Transport (SshTransport)    │
//!  └──────────────────────────────┘
//! ```
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]      | `RetaliationConfig` defaults, banner validation |
//! | [`credential`]  | `Credential` and `CredentialEvent` |
//! | [`breaker`]     | Consecutive network-failure circuit breaker |
//! | [`transport`]   | `Transport` trait and the russh-backed `SshTransport` |
//! | [`worker`]      | Per-host worker loop |
//! | [`dispatcher`]  | Coordinator task and its `DispatchHandle` |
//! | [`ingress`]     | Boundary used by the SSH server |
//! | [`metrics`]     | Atomic counters for operators and tests |
//! | [`error`]       | Crate-wide error enum |

pub mod breaker;
pub mod config;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod ingress;
pub mod metrics;
pub mod transport;
pub mod worker;

#[cfg(any(test, feature = "dev-context-only-utils"))]
pub mod test_utils;

pub use {
    config::RetaliationConfig,
    credential::{Credential, CredentialEvent},
    dispatcher::{DispatchCache, DispatchHandle},
    ingress::{AllowList, IngressAdapter, IngressOutcome},
    metrics::{MetricsSnapshot, RetaliationMetrics},
    transport::{LoginOutcome, SshTransport, Transport},
    worker::{HostWorker, WorkerExit, WorkerId},
};
