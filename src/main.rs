use apiwatch::alerting::{AlertEvaluator, EvaluatorOptions};
use apiwatch::config::EngineConfig;
use apiwatch::db::{MonitorStore, SeaOrmStore};
use apiwatch::notifications::senders::NotificationSender;
use apiwatch::notifications::senders::discord::DiscordSender;
use apiwatch::notifications::senders::email::EmailSender;
use apiwatch::notifications::senders::pagerduty::PagerDutySender;
use apiwatch::notifications::senders::slack::SlackSender;
use apiwatch::probe::{ProbeExecutor, ProbeScheduler, SchedulerOptions};
use apiwatch::version::VERSION;

use clap::Parser;
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "apiwatch.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info,sea_orm=warn` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

fn build_senders(
    config: &EngineConfig,
) -> Result<Vec<Arc<dyn NotificationSender>>, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    Ok(vec![
        Arc::new(SlackSender::new(client.clone(), &config.slack_api_url)),
        Arc::new(DiscordSender::new(client.clone())),
        Arc::new(PagerDutySender::new(client, &config.pagerduty_api_url)),
        Arc::new(EmailSender::new()),
    ])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Manually check for --version before full parsing to keep the output short.
    if std::env::args().any(|arg| arg == "--version") {
        println!("apiwatch version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    // Logging needs `log_dir`, so configuration errors surface through main's return.
    let config = EngineConfig::load(args.config.as_deref())?;
    init_logging(&config.log_dir);
    info!("Starting apiwatch, version: {}", VERSION);
    for fallback in &config.fallbacks {
        warn!("{fallback}");
    }

    // --- Database Setup ---
    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(10);
    let db = match Database::connect(opt).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to connect to the database.");
            return Err(e.into());
        }
    };
    let store: Arc<dyn MonitorStore> = Arc::new(SeaOrmStore::new(db));

    // --- Probe Subsystem ---
    let executor = ProbeExecutor::new(store.clone(), config.request_timeout)?;
    let scheduler = ProbeScheduler::new(
        store.clone(),
        executor,
        SchedulerOptions {
            workers: config.probe_workers,
            tick: config.scheduler_tick,
            ..SchedulerOptions::default()
        },
    );

    // --- Alert Subsystem ---
    let evaluator = AlertEvaluator::new(
        store.clone(),
        build_senders(&config)?,
        EvaluatorOptions {
            tick: config.alert_check_interval,
            workers_per_channel: config.alert_workers,
            ..EvaluatorOptions::default()
        },
    );

    let shutdown = CancellationToken::new();
    let scheduler_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { scheduler.run(shutdown).await }
    });
    let evaluator_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { evaluator.run(shutdown).await }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal.");
    }
    info!("Shutdown signal received, draining work queues.");
    shutdown.cancel();

    let (scheduler_outcome, evaluator_outcome) = tokio::join!(scheduler_handle, evaluator_handle);
    evaluator_outcome?;
    scheduler_outcome?;

    info!("apiwatch stopped.");
    Ok(())
}
