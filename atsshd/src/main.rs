use {
    anyhow::{Context, Result},
    atsshd_honeypot::{load_host_keys, HoneypotServer},
    atsshd_retaliation::{DispatchCache, IngressAdapter, RetaliationMetrics, SshTransport},
    log::{info, warn},
    settings::Settings,
    std::sync::Arc,
    tokio_util::sync::CancellationToken,
};

mod cli;
mod config_file;
mod settings;

fn main() -> Result<()> {
    let matches = cli::app(env!("CARGO_PKG_VERSION")).get_matches();
    let settings = Settings::from_matches(&matches)?;

    match &settings.log_file {
        Some(path) => {
            atsshd_logger::setup_file_with_default(path, &settings.log_filter)
                .with_context(|| format!("unable to open logfile: {}", path.display()))?;
        }
        None => atsshd_logger::setup_with_default(&settings.log_filter),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("atsshd")
        .enable_all()
        .build()
        .context("unable to start tokio runtime")?;
    runtime.block_on(run(settings))
}

async fn run(settings: Settings) -> Result<()> {
    let cancel = CancellationToken::new();
    let metrics = Arc::new(RetaliationMetrics::new());

    let (ingress, dispatcher) = if settings.attack {
        let transport = Arc::new(SshTransport::new(&settings.retaliation));
        let (handle, task) = DispatchCache::spawn(
            settings.retaliation.clone(),
            transport,
            Arc::clone(&metrics),
            cancel.clone(),
        )?;
        (
            IngressAdapter::retaliating(handle, settings.allow_list.clone()),
            Some(task),
        )
    } else {
        (IngressAdapter::passive(), None)
    };

    let keys = load_host_keys(&settings.honeypot.host_key_files)?;
    let server = HoneypotServer::new(settings.honeypot, keys, Arc::new(ingress))?;
    let listener = server.bind(cancel.clone()).await?;

    if settings.attack {
        warn!("WARNING: attack mode is on.  Incoming clients will be attacked.");
    } else {
        info!("passive mode is on.  Incoming clients will not be attacked.");
    }

    tokio::signal::ctrl_c()
        .await
        .context("unable to listen for ctrl-c")?;
    info!("shutting down");
    cancel.cancel();

    listener.join().await;
    if let Some(task) = dispatcher {
        if let Err(e) = task.await {
            warn!("dispatch cache task failed: {}", e);
        }
        info!("retaliation totals: {}", metrics.snapshot());
    }
    Ok(())
}
