use clap::Parser;
use multibagger_core::refresh::RefreshOutcome;
use multibagger_core::service::MultibaggerService;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

#[derive(Debug, Parser)]
#[command(name = "multibagger_worker")]
struct Args {
    /// Keep running: refresh on the interval and write a CSV after every published snapshot.
    #[arg(long)]
    watch: bool,

    /// Refresh interval in watch mode. Defaults to REFRESH_INTERVAL_SECS.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Directory the CSV export is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Refresh and log the summary, but write nothing.
    #[arg(long)]
    dry_run: bool,

    /// Dataset name used as the export filename prefix. Defaults to EXPORT_DATASET.
    #[arg(long)]
    dataset: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = multibagger_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Some(dataset) = args.dataset.clone() {
        settings.export_dataset = dataset;
    }
    if let Some(secs) = args.interval_secs.filter(|&n| n > 0) {
        settings.refresh_interval = Duration::from_secs(secs);
    }
    settings.auto_refresh = args.watch;

    let ist = multibagger_core::time::ist::ist()?;
    tracing::info!(
        market_time = %chrono::Utc::now().with_timezone(&ist).format("%Y-%m-%d %H:%M %:z"),
        watch = args.watch,
        dry_run = args.dry_run,
        dataset = %settings.export_dataset,
        "worker starting"
    );

    let service = MultibaggerService::from_settings(&settings)?;

    let result = if args.watch {
        run_watch(&service, &args).await
    } else {
        run_once(&service, &args).await
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    result
}

async fn run_once(service: &MultibaggerService, args: &Args) -> anyhow::Result<()> {
    match service.refresh_now().await {
        RefreshOutcome::Published {
            cycle_id,
            stocks,
            elapsed_ms,
        } => {
            tracing::info!(%cycle_id, stocks, elapsed_ms, "refresh published");
            write_current(service, args)
        }
        RefreshOutcome::SkippedEmptyCatalog => {
            anyhow::bail!("catalog returned no symbols; nothing to export")
        }
        RefreshOutcome::Rejected { reason } => {
            anyhow::bail!("refresh rejected: {reason}")
        }
        RefreshOutcome::AlreadyRunning => {
            anyhow::bail!("refresh already running")
        }
    }
}

async fn run_watch(service: &MultibaggerService, args: &Args) -> anyhow::Result<()> {
    let mut snapshots = service.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = service.spawn_auto_refresh(shutdown_rx);

    // Don't wait a full interval for the first export.
    let outcome = service.refresh_now().await;
    tracing::info!(?outcome, "initial refresh finished");

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Err(err) = write_current(service, args) {
                    // A failed write is retried on the next snapshot.
                    sentry_anyhow::capture_anyhow(&err);
                    tracing::error!(error = %err, "export write failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    scheduler.await?;
    Ok(())
}

fn write_current(service: &MultibaggerService, args: &Args) -> anyhow::Result<()> {
    let summary = service.summary();
    tracing::info!(
        total = summary.total,
        high = summary.high,
        medium = summary.medium,
        low = summary.low,
        average_score = summary.average_score,
        "snapshot summary"
    );

    if args.dry_run {
        tracing::info!(dry_run = true, "skipping csv write");
        return Ok(());
    }

    let export = service.export_csv()?;
    let path = output::write_export(&args.out_dir, &export)?;
    tracing::info!(path = %path.display(), rows = summary.total, "csv written");
    Ok(())
}

fn init_sentry(settings: &multibagger_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
