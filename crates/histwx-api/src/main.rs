use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use histwx_config::{AppConfig, StoreBackend};
use histwx_core::{ObservationGateway, PageLimits, QueryService};
use histwx_ingest::FeedLoader;
use histwx_obs::LogFormat;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Config first so the log format can be chosen
    let cfg = AppConfig::load().context("loading configuration")?;

    // Observability
    histwx_obs::init("histwxd", LogFormat::parse(&cfg.log_format()));

    let gateway = open_store(&cfg)?;
    let limits = PageLimits {
        default_size: cfg.default_page_size(),
        max_size: cfg.max_page_size(),
    };
    let service = QueryService::new(Arc::clone(&gateway), limits);
    let (app, state) = histwx_api::build_app(service)?;

    // Ingest the feed once, before serving
    let data_file = cfg.data_file();
    let report = FeedLoader::new()
        .with_header(cfg.skip_header())
        .ingest_file(&data_file, gateway.as_ref())
        .await
        .with_context(|| format!("ingesting {data_file}"))?;
    tracing::info!(
        inserted = report.inserted,
        skipped = report.skipped,
        "observation feed loaded"
    );

    let stats = state
        .service
        .statistics()
        .await
        .context("computing startup statistics")?;
    tracing::info!(
        total = stats.total_records,
        avg_temperature = ?stats.temperature.average,
        avg_humidity = ?stats.humidity.average,
        "store summary"
    );

    let addr: SocketAddr = cfg
        .http_bind()
        .parse()
        .context("invalid HTTP bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    // Mark ready just before serving
    histwx_api::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn open_store(cfg: &AppConfig) -> Result<Arc<dyn ObservationGateway>> {
    match cfg.store_backend() {
        StoreBackend::Memory => {
            tracing::info!("using in-memory store");
            Ok(Arc::new(histwx_store::MemoryStore::new()))
        }
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => {
            let path = cfg.store_path();
            tracing::info!(%path, "using sqlite store");
            // The feed is re-ingested on every start
            let store = histwx_store::sqlite::SqliteStore::recreate(&path)
                .with_context(|| format!("opening sqlite store at {path}"))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => {
            anyhow::bail!("sqlite backend requested but histwxd was built without the sqlite feature")
        }
    }
}
