// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use gateway_client::ChainClient;
use gateway_events::{EventBus, GatewayEvent, Metrics};
use log::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{config::FetcherConfig, error::QueueFull};

const LOG_TARGET: &str = "gateway::ingest::fetcher";

/// Single-consumer FIFO of tx ids that failed to fetch synchronously with their block.
/// Fetches each via `C` and publishes `tx-fetched` on success; failures are logged and
/// dropped, left for the repair worker to re-queue later.
pub struct TxFetcher {
    client: Arc<dyn ChainClient>,
    bus: EventBus,
    metrics: Arc<Metrics>,
    sender: mpsc::Sender<String>,
    receiver: Mutex<Option<mpsc::Receiver<String>>>,
    pending: Mutex<HashSet<String>>,
    cancel: CancellationToken,
}

impl TxFetcher {
    pub fn new(client: Arc<dyn ChainClient>, bus: EventBus, metrics: Arc<Metrics>, config: FetcherConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_depth);
        Self {
            client,
            bus,
            metrics,
            sender,
            receiver: Mutex::new(Some(receiver)),
            pending: Mutex::new(HashSet::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// De-duplicates against ids already queued or in-flight: a re-add while an id is
    /// pending is a no-op, not an error. Rejects with `QueueFull` only when the id is
    /// genuinely new and the bounded queue has no room.
    pub fn queue_tx_id(&self, id: String) -> Result<(), QueueFull> {
        {
            let mut pending = self.pending.lock().unwrap();
            if !pending.insert(id.clone()) {
                return Ok(());
            }
        }
        match self.sender.try_send(id.clone()) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(QueueFull)
            },
        }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Runs until `stop()` is called. Must be called at most once per fetcher: the
    /// receiver half of the queue is taken on first call.
    pub async fn run(&self) {
        let mut receiver = self.receiver.lock().unwrap().take().expect("TxFetcher::run called more than once");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                maybe_id = receiver.recv() => {
                    let Some(id) = maybe_id else { break };
                    self.fetch_one(&id).await;
                    self.pending.lock().unwrap().remove(&id);
                },
            }
        }
    }

    async fn fetch_one(&self, id: &str) {
        match self.client.get_tx(id).await {
            Ok(tx) => {
                self.metrics.inc_txs_fetched();
                self.bus.publish(GatewayEvent::TxFetched { tx });
            },
            Err(e) => {
                debug!(target: LOG_TARGET, "tx {id} still unavailable: {e}, leaving it for the repair worker");
            },
        }
    }
}
