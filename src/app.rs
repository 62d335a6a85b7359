//! Process wiring. Startup is sequential: discover the assets, create their
//! records, then start the ingestion task and the HTTP server. Any failure
//! before the server is listening aborts the process, as does the ingestion
//! task dying later.

use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::catalog::AssetCatalog;
use crate::config::Config;
use crate::feed::{HttpFetcher, SnapshotFetcher};
use crate::ingest::IngestionLoop;
use crate::logging::{log_catalog, log_startup};
use crate::render::DashboardRenderer;
use crate::server::{self, DashboardState};
use crate::store::SeriesStore;

/// Discovery plus the storage init pass.
pub async fn prepare<F>(fetcher: &F, store: &SeriesStore) -> crate::Result<AssetCatalog>
where
    F: SnapshotFetcher + ?Sized,
{
    let catalog = AssetCatalog::discover(fetcher).await?;
    log_catalog(catalog.assets());
    store.init(catalog.assets())?;
    Ok(catalog)
}

pub async fn run(cfg: Config) -> Result<()> {
    cfg.validate()?;
    log_startup(&cfg.stats_url, &cfg.data_dir, &cfg.bind_addr, cfg.poll_secs);

    let fetcher = HttpFetcher::new(cfg.stats_url.clone());
    let store = SeriesStore::new(&cfg.data_dir);
    let catalog = prepare(&fetcher, &store)
        .await
        .context("startup: asset discovery / storage init")?;

    let ingest = IngestionLoop::new(fetcher, store.clone(), cfg.poll_interval());
    let ingest = tokio::spawn(ingest.run());

    let state = DashboardState {
        renderer: Arc::new(DashboardRenderer::new(store)),
        assets: Arc::new(catalog.assets().to_vec()),
    };
    let bind_addr = cfg.bind_addr.clone();
    let serve = async move {
        server::serve(state, &bind_addr)
            .await
            .with_context(|| format!("http server on {}", bind_addr))
    };
    supervise(serve, ingest).await
}

/// Waits on the server and the ingestion task together. The loop never returns
/// on its own, so its task finishing (panic or cancellation) is fatal.
pub async fn supervise<S>(serve: S, ingest: JoinHandle<()>) -> Result<()>
where
    S: Future<Output = Result<()>>,
{
    tokio::select! {
        res = serve => res,
        joined = ingest => match joined {
            Ok(()) => Err(anyhow!("ingestion loop exited")),
            Err(e) => Err(anyhow!("ingestion loop failed: {}", e)),
        },
    }
}
