use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use roster_app::config::Config;
use roster_server::{AppBuilder, logs::setup_logging};

#[tokio::main]
#[cfg(not(tarpaulin_include))]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("load configuration")?;
    let _log_guard = setup_logging(&config);

    tracing::info!(service = %config.service_name, listen = %config.listen, "starting");

    let app = AppBuilder::new()
        .config(config)
        .build()
        .await
        .context("build application")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    if let Err(errors) = app.run(cancel).await {
        for err in errors.errors() {
            tracing::error!(phase = ?err.phase(), "{err}");
        }
        anyhow::bail!("application stopped with {} error(s)", errors.errors().len());
    }

    tracing::info!("stopped");
    Ok(())
}

#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
