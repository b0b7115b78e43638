//! E2E: worker lifecycle under load, backpressure and idle expiry.

use {
    atsshd_e2e_tests::helpers::*,
    atsshd_retaliation::{
        config::CRED_BACKLOG,
        test_utils::{wait_until, ScriptedTransport},
        RetaliationConfig,
    },
    std::{sync::Arc, time::Duration},
    tokio::sync::Semaphore,
};

#[tokio::test]
async fn test_attempts_follow_submission_order() {
    init_logging();
    let pipeline = Pipeline::start(ScriptedTransport::rejecting());

    for n in 0..20 {
        pipeline.submit("10.1.0.1", "root", &n.to_string()).await;
    }
    pipeline.settle(20).await;

    let secrets: Vec<String> = pipeline
        .transport
        .logins()
        .iter()
        .map(|login| login.credential.secret().to_string())
        .collect();
    let expected: Vec<String> = (0..20).map(|n: i32| n.to_string()).collect();
    assert_eq!(secrets, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_burst_creates_one_worker() {
    init_logging();
    let pipeline = Arc::new(Pipeline::start(ScriptedTransport::rejecting()));

    let producers: Vec<_> = (0..10)
        .map(|p| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                for n in 0..50 {
                    pipeline
                        .submit("10.1.0.2", "root", &format!("{p}-{n}"))
                        .await;
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    let snap = pipeline.settle(500).await;
    assert_eq!(snap.workers_spawned, 1);
    assert_eq!(snap.credentials_accepted, 500);
    assert_eq!(snap.login_failures, 500);
    assert_eq!(
        pipeline.handle.active_hosts().await.unwrap(),
        vec!["10.1.0.2".to_string()]
    );
}

#[tokio::test]
async fn test_full_inbox_drops_silently() {
    init_logging();
    let gate = Arc::new(Semaphore::new(0));
    let pipeline = Pipeline::start(ScriptedTransport::rejecting().with_gate(Arc::clone(&gate)));

    // Park the worker inside its first attempt so nothing drains the inbox.
    pipeline.submit("10.1.0.3", "root", "first").await;
    let transport = Arc::clone(&pipeline.transport);
    assert!(wait_until(SETTLE, || transport.connects_started() == 1).await);

    for n in 0..CRED_BACKLOG + 5 {
        pipeline.submit("10.1.0.3", "root", &n.to_string()).await;
    }
    // Round-trip through the coordinator so every submit has been handled.
    pipeline.handle.active_hosts().await.unwrap();

    let snap = pipeline.snapshot();
    assert_eq!(snap.credentials_dropped, 5);
    assert_eq!(snap.credentials_accepted, CRED_BACKLOG as u64 + 1);
    assert_eq!(snap.workers_spawned, 1);

    gate.add_permits(CRED_BACKLOG + 1);
    let snap = pipeline.settle(CRED_BACKLOG as u64 + 1).await;
    assert_eq!(snap.login_failures, CRED_BACKLOG as u64 + 1);
}

#[tokio::test]
async fn test_idle_worker_evicted_then_recreated() {
    init_logging();
    let mut config = RetaliationConfig::dev_default();
    config.idle_timeout = Duration::from_millis(100);
    let pipeline = Pipeline::start_with(ScriptedTransport::rejecting(), config);

    pipeline.submit("10.1.0.4", "root", "a").await;
    pipeline.settle(1).await;

    let metrics = Arc::clone(&pipeline.metrics);
    assert!(wait_until(SETTLE, || metrics.snapshot().workers_removed == 1).await);
    assert!(pipeline.handle.active_hosts().await.unwrap().is_empty());
    assert_eq!(pipeline.snapshot().active_workers, 0);

    pipeline.submit("10.1.0.4", "root", "b").await;
    pipeline.settle(2).await;
    let snap = pipeline.snapshot();
    assert_eq!(snap.workers_spawned, 2);
    assert_eq!(snap.login_failures, 2);
}

#[tokio::test]
async fn test_shutdown_stops_pipeline() {
    init_logging();
    let pipeline = Pipeline::start(ScriptedTransport::rejecting());
    pipeline.submit("10.1.0.5", "root", "a").await;
    pipeline.settle(1).await;

    pipeline.handle.shutdown();
    let handle = pipeline.handle.clone();
    let mut closed = false;
    for _ in 0..200 {
        if handle.active_hosts().await.is_err() {
            closed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(closed, "dispatch cache still answering after shutdown");
}
