//! E2E: captured credentials flow from ingress to a login attempt against
//! their source host, and nowhere else.

use {
    atsshd_e2e_tests::helpers::*,
    atsshd_retaliation::{
        test_utils::{wait_until, ScriptedTransport},
        AllowList, Credential, IngressAdapter, IngressOutcome,
    },
    std::net::SocketAddr,
};

// ─────────────────────────────────────────────────────────────────────────────
// A reachable host that accepts the password
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_working_password_is_reported() {
    init_logging();
    let pipeline = Pipeline::start(ScriptedTransport::accepting());

    pipeline.submit("10.0.0.5", "root", "toor").await;
    let snap = pipeline.settle(1).await;

    assert_eq!(snap.login_successes, 1);
    assert_eq!(snap.login_failures, 0);
    assert_eq!(snap.connect_failures, 0);
    let logins = pipeline.transport.logins();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].target, "10.0.0.5:22");
    assert_eq!(logins[0].credential, Credential::new("root", "toor"));
    let success = ["*** SUCCESS ***", "root:toor", "10.0.0.5"];
    assert!(wait_until(SETTLE, || !log_lines(&success).is_empty()).await);
    assert_eq!(log_lines(&success).len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// An unreachable host trips the breaker after three failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_host_skipped_after_three_failures() {
    init_logging();
    let pipeline = Pipeline::start(ScriptedTransport::unreachable());

    for secret in ["a", "b", "c"] {
        pipeline.submit("10.0.0.9", "root", secret).await;
    }
    let snap = pipeline.settle(3).await;
    assert_eq!(snap.connect_failures, 3);
    assert_eq!(pipeline.transport.connect_attempts().len(), 3);

    pipeline.submit("10.0.0.9", "root", "d").await;
    let snap = pipeline.settle(4).await;
    assert_eq!(snap.attempts_skipped, 1);
    assert_eq!(snap.breaker_trips, 1);
    assert_eq!(snap.connect_failures, 3);
    assert_eq!(pipeline.transport.connect_attempts().len(), 3);
    let trip = ["NOT attacking 10.0.0.9:", "too many network failures"];
    assert_eq!(log_lines(&trip).len(), 1);

    // Further skips do not re-announce the trip.
    pipeline.submit("10.0.0.9", "root", "e").await;
    let snap = pipeline.settle(5).await;
    assert_eq!(snap.attempts_skipped, 2);
    assert_eq!(snap.breaker_trips, 1);
    assert_eq!(log_lines(&trip).len(), 1);
}

#[tokio::test]
async fn test_breaker_is_per_host() {
    init_logging();
    // Three refusals for the first host, everything after that connects.
    let pipeline = Pipeline::start(
        ScriptedTransport::rejecting().with_connect_script([false, false, false]),
    );

    for secret in ["a", "b", "c", "d"] {
        pipeline.submit("10.0.0.19", "root", secret).await;
    }
    pipeline.settle(4).await;

    pipeline.submit("10.0.0.20", "root", "a").await;
    let snap = pipeline.settle(5).await;
    assert_eq!(snap.attempts_skipped, 1);
    assert_eq!(snap.login_failures, 1);
    assert_eq!(pipeline.transport.logins()[0].target, "10.0.0.20:22");
}

// ─────────────────────────────────────────────────────────────────────────────
// Loopback attackers never reach the dispatcher
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_loopback_attacker_is_protected() {
    init_logging();
    let pipeline = Pipeline::start(ScriptedTransport::accepting());
    let ingress = IngressAdapter::retaliating(pipeline.handle.clone(), AllowList::loopback());

    for peer in ["127.0.0.1:50022", "[::1]:50022", "[::ffff:127.0.0.1]:50022"] {
        let peer: SocketAddr = peer.parse().unwrap();
        assert_eq!(
            ingress.password_attempt(peer, None, "root", "toor").await,
            IngressOutcome::Protected
        );
    }

    assert!(pipeline.handle.active_hosts().await.unwrap().is_empty());
    assert_eq!(pipeline.snapshot().workers_spawned, 0);
    assert!(pipeline.transport.connect_attempts().is_empty());
}

#[tokio::test]
async fn test_ingress_routes_by_host_not_port() {
    init_logging();
    let pipeline = Pipeline::start(ScriptedTransport::rejecting());
    let ingress = IngressAdapter::retaliating(pipeline.handle.clone(), AllowList::loopback());

    for port in [40000, 40001, 40002] {
        let peer = SocketAddr::from(([198, 51, 100, 7], port));
        assert_eq!(
            ingress
                .password_attempt(peer, Some("SSH-2.0-Go"), "admin", "admin")
                .await,
            IngressOutcome::Submitted
        );
    }
    pipeline.settle(3).await;

    assert_eq!(
        pipeline.handle.active_hosts().await.unwrap(),
        vec!["198.51.100.7".to_string()]
    );
    assert_eq!(pipeline.snapshot().workers_spawned, 1);
    let transport = &pipeline.transport;
    assert!(wait_until(SETTLE, || transport.logins().len() == 3).await);
    assert!(transport
        .logins()
        .iter()
        .all(|login| login.target == "198.51.100.7:22"));
}
