// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use gateway_db::ChainDatabase;
use gateway_events::{EventBus, GatewayEvent, Metrics};
use log::*;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "gateway::ingest::tx_importer";

/// Subscribes to `tx-fetched` and persists each arriving transaction into `D`. Errors are
/// logged; the tx simply stays in the missing-tx journal until fetched again.
pub struct TxImporter {
    db: Arc<dyn ChainDatabase>,
    bus: EventBus,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
}

impl TxImporter {
    pub fn new(db: Arc<dyn ChainDatabase>, bus: EventBus, metrics: Arc<Metrics>) -> Self {
        Self { db, bus, metrics, cancel: CancellationToken::new() }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub async fn run(&self) {
        let mut rx = self.bus.subscribe();
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = rx.recv() => {
                    match event {
                        Ok(GatewayEvent::TxFetched { tx }) => self.import(tx).await,
                        Ok(GatewayEvent::BlockTxFetchFailed { .. }) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(target: LOG_TARGET, "lagged behind the event bus, missed {skipped} events");
                        },
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                },
            }
        }
    }

    async fn import(&self, tx: gateway_client::Transaction) {
        let id = tx.id.clone();
        match self.db.save_tx(tx).await {
            Ok(()) => self.metrics.inc_txs_imported(),
            Err(e) => {
                self.metrics.inc_errors();
                error!(target: LOG_TARGET, "failed to persist tx {id}: {e}");
            },
        }
    }
}
