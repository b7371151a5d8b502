use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use multibagger_core::domain::{MultibaggerScore, NewsItem, Snapshot, SnapshotSummary, Stock, Verdict};
use multibagger_core::refresh::{RefreshOutcome, RefreshStatus};
use multibagger_core::service::{CharacteristicInfo, MultibaggerService};

const DEFAULT_NEWS_LIMIT: usize = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = multibagger_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let service = match MultibaggerService::from_settings(&settings) {
        Ok(service) => service,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "service configuration failed");
            return Err(e);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = service.spawn_auto_refresh(shutdown_rx);

    // First snapshot is built in the background; reads return the empty snapshot until then.
    {
        let service = service.clone();
        tokio::spawn(async move {
            let outcome = service.refresh_now().await;
            tracing::info!(?outcome, "initial refresh finished");
        });
    }

    let app = router(AppState { service });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        tracing::warn!(error = %e, "auto-refresh task ended abnormally");
    }

    Ok(())
}

#[derive(Clone)]
struct AppState {
    service: MultibaggerService,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/snapshot", get(get_snapshot))
        .route("/stocks", get(get_stocks))
        .route("/scores", get(get_scores))
        .route("/scores/:symbol", get(get_score))
        .route("/summary", get(get_summary))
        .route("/news", get(get_news))
        .route("/sectors", get(get_sectors))
        .route("/characteristics", get(get_characteristics))
        .route("/refresh", post(post_refresh))
        .route("/auto-refresh", put(put_auto_refresh))
        .route("/status", get(get_status))
        .route("/export.csv", get(get_export_csv))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.service.snapshot().as_ref().clone())
}

#[derive(Debug, Deserialize)]
struct StocksQuery {
    sector: Option<String>,
}

async fn get_stocks(
    State(state): State<AppState>,
    Query(query): Query<StocksQuery>,
) -> Json<Vec<Stock>> {
    let stocks = match query.sector.as_deref() {
        Some(sector) => state.service.stocks_by_sector(sector),
        None => state.service.snapshot().stocks().to_vec(),
    };
    Json(stocks)
}

#[derive(Debug, Deserialize)]
struct ScoresQuery {
    verdict: Option<String>,
}

async fn get_scores(
    State(state): State<AppState>,
    Query(query): Query<ScoresQuery>,
) -> Result<Json<Vec<MultibaggerScore>>, StatusCode> {
    let scores = match query.verdict.as_deref() {
        Some(raw) => {
            let verdict = raw.parse::<Verdict>().map_err(|_| StatusCode::BAD_REQUEST)?;
            state.service.scores_by_verdict(verdict)
        }
        None => state.service.snapshot().scores().to_vec(),
    };
    Ok(Json(scores))
}

async fn get_score(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<MultibaggerScore>, StatusCode> {
    state
        .service
        .score_for(&symbol)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_summary(State(state): State<AppState>) -> Json<SnapshotSummary> {
    Json(state.service.summary())
}

#[derive(Debug, Deserialize)]
struct NewsQuery {
    limit: Option<usize>,
}

async fn get_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Json<Vec<NewsItem>> {
    Json(state.service.latest_news(query.limit.unwrap_or(DEFAULT_NEWS_LIMIT)))
}

async fn get_sectors(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.service.sectors())
}

async fn get_characteristics(State(state): State<AppState>) -> Json<Vec<CharacteristicInfo>> {
    Json(state.service.characteristics())
}

async fn post_refresh(State(state): State<AppState>) -> Result<Json<RefreshOutcome>, StatusCode> {
    match state.service.refresh_now().await {
        RefreshOutcome::AlreadyRunning => Err(StatusCode::CONFLICT),
        outcome => Ok(Json(outcome)),
    }
}

#[derive(Debug, Deserialize)]
struct AutoRefreshBody {
    enabled: bool,
}

async fn put_auto_refresh(
    State(state): State<AppState>,
    Json(body): Json<AutoRefreshBody>,
) -> Json<RefreshStatus> {
    state.service.set_auto_refresh(body.enabled);
    Json(state.service.status())
}

async fn get_status(State(state): State<AppState>) -> Json<RefreshStatus> {
    Json(state.service.status())
}

async fn get_export_csv(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let export = state.service.export_csv().map_err(|e| {
        let err = anyhow::Error::new(e);
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "csv export failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    ))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
