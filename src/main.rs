use anyhow::Context;
use clap::Parser;
use homework_notifier::cli::Cli;
use homework_notifier::config::{AppConfig, Credentials};
use homework_notifier::logging;
use homework_notifier::{PracticumClient, StatusPoller, TelegramNotifier};
use std::process::ExitCode;
use tokio::signal;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let mut config = match AppConfig::load_from(&cli.config_dir, &std::env::vars().collect()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(interval) = cli.interval {
        config.retry_secs = interval;
    }

    let logging = logging::init(&config.logging);
    if let Some(path) = logging.file_path() {
        info!("Logging to: {}", path);
    }

    if let Err(errors) = config.validate() {
        for e in errors {
            error!("Invalid configuration: {}", e);
        }
        return ExitCode::FAILURE;
    }

    let credentials = match config.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("CRITICAL: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &config, &credentials).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("CRITICAL: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: &AppConfig, credentials: &Credentials) -> anyhow::Result<()> {
    let api = PracticumClient::new(
        &config.endpoint,
        &credentials.practicum_token,
        config.request_timeout(),
    )
    .context("failed to build homework API client")?;

    let notifier = TelegramNotifier::new(
        &config.telegram_api_url,
        &credentials.telegram_token,
        &credentials.chat_id,
        config.request_timeout(),
    )
    .context("failed to build Telegram client")?;

    let mut poller = match cli.from_date {
        Some(from_date) => {
            StatusPoller::with_cursor(api, notifier, config.retry_interval(), from_date)
        }
        None => StatusPoller::new(api, notifier, config.retry_interval()),
    };

    if cli.once {
        let outcome = poller.tick().await;
        info!("Single poll finished: {:?}", outcome);
        return Ok(());
    }

    poller.run_until(shutdown_signal()).await;
    info!("Homework notifier stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
