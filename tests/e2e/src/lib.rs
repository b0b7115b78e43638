//! atsshd End-to-End Test Suite
//!
//! Drives the whole retaliation pipeline (ingress, dispatch cache, host
//! workers) against a scripted transport, so no packets leave the machine.
//!
//! ```bash
//! cargo test -p atsshd-e2e-tests --test retaliation_scenarios -- --nocapture
//! cargo test -p atsshd-e2e-tests --test dispatch_lifecycle -- --nocapture
//! ```

pub mod helpers;
