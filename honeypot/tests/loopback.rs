//! A real SSH client against a real honeypot on loopback.

use {
    atsshd_honeypot::{load_host_keys, HoneypotConfig, HoneypotServer},
    atsshd_retaliation::{
        test_utils::{wait_until, ScriptedTransport},
        AllowList, Credential, DispatchCache, DispatchHandle, IngressAdapter, LoginOutcome,
        RetaliationConfig, RetaliationMetrics, SshTransport, Transport,
    },
    std::{net::SocketAddr, sync::Arc, time::Duration},
    tokio_util::sync::CancellationToken,
};

async fn start_honeypot(ingress: IngressAdapter, cancel: CancellationToken) -> SocketAddr {
    let server = HoneypotServer::new(
        HoneypotConfig::dev_default(),
        load_host_keys(&[]).unwrap(),
        Arc::new(ingress),
    )
    .unwrap();
    server.bind(cancel).await.unwrap().local_addr
}

fn start_dispatcher(cancel: CancellationToken) -> (DispatchHandle, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::rejecting());
    let (handle, _task) = DispatchCache::spawn(
        RetaliationConfig::dev_default(),
        Arc::clone(&transport),
        Arc::new(RetaliationMetrics::new()),
        cancel,
    )
    .unwrap();
    (handle, transport)
}

async fn attacker_login(addr: SocketAddr, user: &str, secret: &str) -> LoginOutcome {
    let client = SshTransport::new(&RetaliationConfig::dev_default());
    let host = addr.ip().to_string();
    let connection = client.connect(&host, addr.port()).await.unwrap();
    client
        .login(
            connection,
            &addr.to_string(),
            &Credential::new(user, secret),
            "SSH-2.0-libssh_0.9.6",
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_password_is_rejected_and_replayed() {
    let _ = env_logger::builder().is_test(true).try_init();
    let cancel = CancellationToken::new();
    let (dispatcher, transport) = start_dispatcher(cancel.clone());
    let addr = start_honeypot(
        IngressAdapter::retaliating(dispatcher.clone(), AllowList::new([])),
        cancel.clone(),
    )
    .await;

    assert_eq!(
        attacker_login(addr, "root", "hunter2").await,
        LoginOutcome::Rejected
    );

    assert_eq!(
        dispatcher.active_hosts().await.unwrap(),
        vec!["127.0.0.1".to_string()]
    );
    assert!(wait_until(Duration::from_secs(5), || transport.logins().len() == 1).await);
    let login = &transport.logins()[0];
    assert_eq!(login.target, "127.0.0.1:22");
    assert_eq!(login.credential, Credential::new("root", "hunter2"));
    assert_eq!(login.banner, "SSH-2.0-OpenSSH_6.1p2");

    cancel.cancel();
}

#[tokio::test]
async fn test_loopback_attacker_is_not_replayed() {
    let _ = env_logger::builder().is_test(true).try_init();
    let cancel = CancellationToken::new();
    let (dispatcher, transport) = start_dispatcher(cancel.clone());
    let addr = start_honeypot(
        IngressAdapter::retaliating(dispatcher.clone(), AllowList::loopback()),
        cancel.clone(),
    )
    .await;

    assert_eq!(
        attacker_login(addr, "admin", "admin").await,
        LoginOutcome::Rejected
    );
    assert!(dispatcher.active_hosts().await.unwrap().is_empty());
    assert!(transport.connect_attempts().is_empty());

    cancel.cancel();
}

#[tokio::test]
async fn test_passive_honeypot_still_rejects() {
    let _ = env_logger::builder().is_test(true).try_init();
    let cancel = CancellationToken::new();
    let addr = start_honeypot(IngressAdapter::passive(), cancel.clone()).await;

    assert_eq!(
        attacker_login(addr, "pi", "raspberry").await,
        LoginOutcome::Rejected
    );
    cancel.cancel();
}
