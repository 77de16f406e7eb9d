use std::process::ExitCode;

use mqexec::{AgentConfig, CliArgs, cli, logging, run};
use mqexec_transport::MqttConnector;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    // Invalid settings stop us before any network activity.
    let config = match AgentConfig::resolve(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("mqexec: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = run_main(&args, config).await {
        eprintln!("mqexec error: {err:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run_main(args: &CliArgs, config: AgentConfig) -> anyhow::Result<()> {
    logging::init_logging(args.log_level, config.debug)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    run(config, &MqttConnector::default(), shutdown).await?;
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    wait_for_signal().await;
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
