use anyhow::{bail, Context};
use clap::Parser;
use prometheus::Registry;
use tokio::sync::watch;

use promscript::cli::Cli;
use promscript::config::ExporterConfig;
use promscript::exporter::{
    Collector, RefreshScheduler, RefreshStats, SnapshotPublisher, SnapshotStore,
};
use promscript::logging::app_config;
use promscript::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // initialize the logger
    log4rs::init_config(app_config(cli.log_file.as_deref(), cli.loglevel)?)?;
    log::info!("Starting the exporter!");

    let config = match ExporterConfig::try_from(cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            return Err(e.into());
        }
    };
    log::info!("Script: {}", config.command);
    log::info!("Refresh interval is: {:?}", config.interval);
    log::info!("Command timeout is: {:?}", config.command_timeout);

    let registry = Registry::new();
    let store = SnapshotStore::new();
    registry
        .register(Box::new(SnapshotPublisher::new(store.clone())?))
        .context("unable to register the gauge family")?;
    let stats = RefreshStats::register(&registry).context("unable to register refresh stats")?;

    let collector = Collector::new(config.command.clone(), config.command_timeout);
    let mut scheduler = RefreshScheduler::new(collector, store, config.interval, stats);

    if config.strict_startup {
        log::info!("Strict startup: the first run of the script must succeed");
        if let Err(e) = scheduler.require_first_cycle().await {
            bail!("first run of {} failed: {e}", config.command);
        }
    }

    let (stop_refresh, refresh_stopped) = watch::channel(false);
    let refresh = tokio::spawn(scheduler.run(refresh_stopped));

    let router = server::create_router(registry, &config.metrics_path);
    let served = server::serve(config.listen, router, shutdown_signal()).await;

    log::info!("Shutting down the refresh loop");
    let _ = stop_refresh.send(true);
    if let Err(e) = refresh.await {
        log::error!("Refresh task ended abnormally: {e}");
    }

    served?;
    log::info!("Exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Unable to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                log::error!("Unable to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("SIGINT received"),
        _ = terminate => log::info!("SIGTERM received"),
    }
}
