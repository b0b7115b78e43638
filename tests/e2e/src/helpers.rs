//! Shared setup for the end-to-end scenarios.

use {
    atsshd_retaliation::{
        test_utils::{wait_until, ScriptedTransport},
        Credential, CredentialEvent, DispatchCache, DispatchHandle, MetricsSnapshot,
        RetaliationConfig, RetaliationMetrics,
    },
    log::{Log, Metadata, Record},
    parking_lot::Mutex,
    std::{
        sync::{Arc, Once},
        time::Duration,
    },
    tokio_util::sync::CancellationToken,
};

/// Upper bound on how long any scenario waits for the pipeline to settle.
pub const SETTLE: Duration = Duration::from_secs(10);

static CAPTURED: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());
static INIT: Once = Once::new();

/// Test logger that forwards to env_logger and keeps every message.
struct CapturingLogger {
    inner: env_logger::Logger,
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.inner.matches(record) {
            CAPTURED.lock().push(record.args().to_string());
        }
        self.inner.log(record);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

pub fn init_logging() {
    INIT.call_once(|| {
        let inner = env_logger::Builder::new()
            .is_test(true)
            .filter_level(log::LevelFilter::Info)
            .build();
        let max_level = inner.filter();
        if log::set_boxed_logger(Box::new(CapturingLogger { inner })).is_ok() {
            log::set_max_level(max_level);
        }
    });
}

/// Captured log messages containing every one of `fragments`.
///
/// The capture is shared by every test in the binary, so callers should
/// include something unique to their scenario, such as the target host.
pub fn log_lines(fragments: &[&str]) -> Vec<String> {
    CAPTURED
        .lock()
        .iter()
        .filter(|line| fragments.iter().all(|f| line.contains(f)))
        .cloned()
        .collect()
}

/// A running dispatch cache plus the scripted transport behind it.
pub struct Pipeline {
    pub handle: DispatchHandle,
    pub transport: Arc<ScriptedTransport>,
    pub metrics: Arc<RetaliationMetrics>,
    pub cancel: CancellationToken,
}

impl Pipeline {
    pub fn start(transport: ScriptedTransport) -> Self {
        Self::start_with(transport, RetaliationConfig::dev_default())
    }

    pub fn start_with(transport: ScriptedTransport, config: RetaliationConfig) -> Self {
        let transport = Arc::new(transport);
        let metrics = Arc::new(RetaliationMetrics::new());
        let cancel = CancellationToken::new();
        let (handle, _task) = DispatchCache::spawn(
            config,
            Arc::clone(&transport),
            Arc::clone(&metrics),
            cancel.clone(),
        )
        .expect("valid config");
        Self {
            handle,
            transport,
            metrics,
            cancel,
        }
    }

    pub async fn submit(&self, host: &str, user: &str, secret: &str) {
        self.handle
            .submit(CredentialEvent::new(host, Credential::new(user, secret)))
            .await;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Wait until `n` attempts have reached a terminal outcome.
    pub async fn settle(&self, n: u64) -> MetricsSnapshot {
        let metrics = Arc::clone(&self.metrics);
        assert!(
            wait_until(SETTLE, || metrics.snapshot().attempts_finished() >= n).await,
            "pipeline did not settle: {}",
            metrics.snapshot()
        );
        self.snapshot()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
