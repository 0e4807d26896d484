// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

mod config;
mod error;
mod http;
mod logging;

use std::{process, sync::Arc};

use clap::Parser;
use gateway_client::{ChainClient, HttpChainClient};
use gateway_data_source::TxChunksDataSource;
use gateway_db::{ChainDatabase, SqliteChainDatabase};
use gateway_events::{EventBus, Metrics};
use gateway_ingest::{BlockImporter, RepairWorker, TxFetcher, TxImporter};
use gateway_stores::ContentStore;
use log::*;
use tokio::{runtime, runtime::Runtime};
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, Cli};

const LOG_TARGET: &str = "gateway::app";

fn main() {
    if let Err(err) = main_inner() {
        eprintln!("{err:?}");
        error!(target: LOG_TARGET, "exiting with error: {err:?}");
        process::exit(1);
    }
}

fn main_inner() -> Result<(), anyhow::Error> {
    logging::initialize_logging()?;
    let cli = Cli::parse();
    let config = AppConfig::load(&cli)?;
    let runtime = build_runtime()?;
    runtime.block_on(run_gateway(config))
}

fn build_runtime() -> Result<Runtime, anyhow::Error> {
    runtime::Builder::new_multi_thread().enable_all().build().map_err(anyhow::Error::from)
}

async fn run_gateway(config: AppConfig) -> Result<(), anyhow::Error> {
    let metrics = Arc::new(Metrics::new());
    let bus = EventBus::default();

    let block_store = ContentStore::new(config.block_store_dir());
    let tx_store = ContentStore::new(config.tx_store_dir());
    let client_config = config.client_config();
    let peer_refresh_interval = client_config.peer_refresh_interval;
    let client: Arc<dyn ChainClient> = Arc::new(HttpChainClient::new(client_config, block_store, tx_store));

    let db: Arc<dyn ChainDatabase> = Arc::new(SqliteChainDatabase::connect(config.sqlite_path())?);
    let data_source = Arc::new(TxChunksDataSource::new(client.clone()));

    let importer =
        Arc::new(BlockImporter::new(client.clone(), db.clone(), bus.clone(), metrics.clone(), config.importer_config()));
    let fetcher =
        Arc::new(TxFetcher::new(client.clone(), bus.clone(), metrics.clone(), config.fetcher_config()));
    let tx_importer = Arc::new(TxImporter::new(db.clone(), bus.clone(), metrics.clone()));
    let repair = Arc::new(RepairWorker::new(db.clone(), fetcher.clone(), metrics.clone(), config.repair_config()));

    let peer_refresh_cancel = CancellationToken::new();

    let importer_task = tokio::spawn({
        let importer = importer.clone();
        async move {
            if let Err(e) = importer.run().await {
                error!(target: LOG_TARGET, "block importer stopped with a fatal error: {e}");
            }
        }
    });
    let fetcher_task = tokio::spawn({
        let fetcher = fetcher.clone();
        async move { fetcher.run().await }
    });
    let tx_importer_task = tokio::spawn({
        let tx_importer = tx_importer.clone();
        async move { tx_importer.run().await }
    });
    let repair_task = tokio::spawn({
        let repair = repair.clone();
        async move { repair.run().await }
    });
    let peer_refresh_task = tokio::spawn({
        let client = client.clone();
        let cancel = peer_refresh_cancel.clone();
        async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(peer_refresh_interval) => {
                        if let Err(e) = client.refresh_peers().await {
                            warn!(target: LOG_TARGET, "peer refresh failed: {e}");
                        }
                    },
                }
            }
        }
    });

    let state = Arc::new(http::AppState { db: db.clone(), data_source, started_at: std::time::Instant::now() });
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(target: LOG_TARGET, "listening on {addr}");
    let server = axum::Server::bind(&addr).serve(http::router(state).into_make_service());

    tokio::select! {
        result = server => result.map_err(anyhow::Error::from)?,
        _ = tokio::signal::ctrl_c() => info!(target: LOG_TARGET, "received shutdown signal"),
    }

    info!(target: LOG_TARGET, "shutting down");
    importer.stop();
    fetcher.stop();
    tx_importer.stop();
    repair.stop();
    peer_refresh_cancel.cancel();

    let results = tokio::join!(importer_task, fetcher_task, tx_importer_task, repair_task, peer_refresh_task);
    for result in [results.0, results.1, results.2, results.3, results.4] {
        report_join_result(&metrics, result);
    }

    Ok(())
}

/// A panicking worker task is a programming error, not an operational one; it is counted
/// separately from the error kinds each component already reports through `metrics`.
fn report_join_result(metrics: &Metrics, result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            metrics.inc_uncaught_exceptions();
            error!(target: LOG_TARGET, "worker task panicked: {e}");
        }
    }
}
