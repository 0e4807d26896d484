// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream::FuturesUnordered, StreamExt};
use gateway_stores::{ContentStore, FailureSimulator};
use log::*;
use reqwest::StatusCode;
use tokio::sync::Semaphore;

use crate::{
    client::ChainClient,
    config::ClientConfig,
    error::ClientError,
    peers::PeerRanking,
    types::{validate_block, validate_tx, Block, BlockAndTxs, Peer, Transaction},
    wire::{WireBlock, WireInfo, WirePeer, WireTransaction},
};

const LOG_TARGET: &str = "gateway::client::http";

/// Two-tier (local cache, then trusted node, then ranked peers) implementation of
/// [`ChainClient`] over the Arweave-style HTTP JSON API.
pub struct HttpChainClient {
    http: reqwest::Client,
    config: ClientConfig,
    block_store: ContentStore,
    tx_store: ContentStore,
    failures: FailureSimulator,
    peers: PeerRanking,
}

impl HttpChainClient {
    pub fn new(config: ClientConfig, block_store: ContentStore, tx_store: ContentStore) -> Self {
        let failures = FailureSimulator::new(config.simulated_request_failure_rate);
        let peer_refresh_interval = config.peer_refresh_interval;
        Self {
            http: reqwest::Client::new(),
            config,
            block_store,
            tx_store,
            failures,
            peers: PeerRanking::new(peer_refresh_interval),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.trusted_node_url.trim_end_matches('/'), path)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
        what: &str,
    ) -> Result<(T, Bytes), ClientError> {
        self.failures.maybe_fail()?;
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e, what))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound { what: what.to_string() });
        }
        if !response.status().is_success() {
            return Err(ClientError::UpstreamUnavailable { what: what.to_string() });
        }
        let bytes = response.bytes().await.map_err(|e| classify_reqwest_error(&e, what))?;
        let parsed = serde_json::from_slice(&bytes).map_err(|_| ClientError::Invalid { what: what.to_string() })?;
        Ok((parsed, bytes))
    }

    async fn block_from_trusted(&self, path: &str, what: &str) -> Result<Block, ClientError> {
        let (wire, bytes): (WireBlock, Bytes) = self.fetch_json(&self.url(path), self.config.block_fetch_timeout, what).await?;
        let block: Block = wire.into();
        if !validate_block(&block) {
            return Err(ClientError::Invalid { what: what.to_string() });
        }
        self.block_store.put(&block.id, &bytes).await?;
        Ok(block)
    }

    async fn tx_from_trusted(&self, id: &str) -> Result<Transaction, ClientError> {
        let what = format!("tx {id}");
        let (wire, bytes): (WireTransaction, Bytes) =
            self.fetch_json(&self.url(&format!("/tx/{id}")), self.config.tx_fetch_timeout, &what).await?;
        let tx: Transaction = wire.into();
        if !validate_tx(&tx) {
            return Err(ClientError::Invalid { what });
        }
        self.tx_store.put(&tx.id, &bytes).await?;
        Ok(tx)
    }

    /// Falls back to peer fan-out when the trusted node failed; `trusted_err` is returned
    /// unchanged if no peer is known or every peer also fails, so a trusted-node 404
    /// still surfaces as `NotFound` rather than being reclassified as unavailable.
    async fn tx_from_peers(&self, id: &str, trusted_err: ClientError) -> Result<Transaction, ClientError> {
        let peers = self.peers.snapshot().await;
        if peers.is_empty() {
            return Err(trusted_err);
        }
        let mut attempts = FuturesUnordered::new();
        for peer in peers {
            attempts.push(self.tx_from_peer(peer, id.to_string()));
        }
        while let Some(result) = attempts.next().await {
            if let Ok(tx) = result {
                return Ok(tx);
            }
        }
        Err(trusted_err)
    }

    async fn tx_from_peer(&self, peer: Peer, id: String) -> Result<Transaction, ClientError> {
        self.failures.maybe_fail()?;
        let url = format!("{}/tx/{id}", peer.address.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .timeout(self.config.tx_fetch_timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e, &id))?;
        if !response.status().is_success() {
            return Err(ClientError::NotFound { what: format!("tx {id} from peer {}", peer.address) });
        }
        let bytes = response.bytes().await.map_err(|e| classify_reqwest_error(&e, &id))?;
        let wire: WireTransaction =
            serde_json::from_slice(&bytes).map_err(|_| ClientError::Invalid { what: format!("tx {id}") })?;
        let tx: Transaction = wire.into();
        if !validate_tx(&tx) {
            return Err(ClientError::Invalid { what: format!("tx {id}") });
        }
        self.tx_store.put(&tx.id, &bytes).await?;
        Ok(tx)
    }

    async fn chunk_from_peers(&self, offset: u64) -> Result<Bytes, ClientError> {
        let peers = self.peers.snapshot().await;
        for peer in peers {
            self.failures.maybe_fail()?;
            let url = format!("{}/chunk/{offset}", peer.address.trim_end_matches('/'));
            let attempt = self.http.get(&url).timeout(self.config.chunk_fetch_timeout).send().await;
            if let Ok(response) = attempt {
                if response.status().is_success() {
                    if let Ok(bytes) = response.bytes().await {
                        return Ok(bytes);
                    }
                }
            }
        }
        Err(ClientError::UpstreamUnavailable { what: format!("chunk at offset {offset}") })
    }
}

fn classify_reqwest_error(error: &reqwest::Error, what: &str) -> ClientError {
    if error.is_timeout() {
        ClientError::Timeout { url: what.to_string() }
    } else {
        ClientError::UpstreamUnavailable { what: what.to_string() }
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn get_block_by_height(&self, height: u64) -> Result<Block, ClientError> {
        // Heights aren't a stable cache key (a height may be re-fetched after a fork), so
        // this always asks the trusted node; the result is write-through cached by id.
        self.block_from_trusted(&format!("/block/height/{height}"), &format!("block at height {height}")).await
    }

    async fn get_block_by_id(&self, id: &str) -> Result<Block, ClientError> {
        let what = format!("block {id}");
        if !self.config.skip_cache {
            if let Some(bytes) = self.block_store.get(id).await? {
                if let Ok(wire) = serde_json::from_slice::<WireBlock>(&bytes) {
                    let block: Block = wire.into();
                    if validate_block(&block) {
                        return Ok(block);
                    }
                }
            }
        }
        self.block_from_trusted(&format!("/block/hash/{id}"), &what).await
    }

    async fn get_tx(&self, id: &str) -> Result<Transaction, ClientError> {
        if !self.config.skip_cache {
            if let Some(bytes) = self.tx_store.get(id).await? {
                if let Ok(wire) = serde_json::from_slice::<WireTransaction>(&bytes) {
                    let tx: Transaction = wire.into();
                    if validate_tx(&tx) {
                        return Ok(tx);
                    }
                }
            }
        }
        match self.tx_from_trusted(id).await {
            Ok(tx) => Ok(tx),
            Err(trusted_err) => self.tx_from_peers(id, trusted_err).await,
        }
    }

    async fn get_block_and_txs_by_height(&self, height: u64) -> Result<BlockAndTxs, ClientError> {
        let block = self.get_block_by_height(height).await?;

        let semaphore = Arc::new(Semaphore::new(self.config.tx_fetch_concurrency));
        let mut fetches = FuturesUnordered::new();
        for id in &block.txs {
            let id = id.clone();
            let semaphore = semaphore.clone();
            fetches.push(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                (id.clone(), self.get_tx(&id).await)
            });
        }

        let mut txs = Vec::with_capacity(block.txs.len());
        let mut missing_tx_ids = Vec::new();
        while let Some((id, result)) = fetches.next().await {
            match result {
                Ok(tx) => txs.push(tx),
                Err(e) => {
                    debug!(target: LOG_TARGET, "tx {id} unavailable synchronously with block {}: {e}", block.id);
                    missing_tx_ids.push(id);
                },
            }
        }
        // Preserve the block's declared tx order for the happy-path (no-missing) case.
        txs.sort_by_key(|tx| block.txs.iter().position(|id| id == &tx.id).unwrap_or(usize::MAX));

        Ok(BlockAndTxs { block, txs, missing_tx_ids })
    }

    async fn get_height(&self) -> Result<u64, ClientError> {
        let (info, _): (WireInfo, Bytes) =
            self.fetch_json(&self.url("/info"), self.config.block_fetch_timeout, "chain tip").await?;
        Ok(info.height)
    }

    async fn get_chunk(&self, absolute_offset: u64) -> Result<Bytes, ClientError> {
        self.failures.maybe_fail()?;
        let url = self.url(&format!("/chunk/{absolute_offset}"));
        let response = self
            .http
            .get(&url)
            .timeout(self.config.chunk_fetch_timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e, &url));
        match response {
            Ok(response) if response.status().is_success() => {
                response.bytes().await.map_err(|e| classify_reqwest_error(&e, &url))
            },
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                self.chunk_from_peers(absolute_offset).await.map_err(|_| ClientError::NotFound {
                    what: format!("chunk at offset {absolute_offset}"),
                })
            },
            _ => self.chunk_from_peers(absolute_offset).await,
        }
    }

    async fn refresh_peers(&self) -> Result<(), ClientError> {
        let (wire_peers, _): (Vec<WirePeer>, Bytes) =
            match self.fetch_json(&self.url("/peers"), self.config.block_fetch_timeout, "peer list").await {
                Ok(v) => v,
                Err(e) => {
                    self.peers.mark_refresh_failed().await;
                    return Err(e);
                },
            };

        let semaphore = Arc::new(Semaphore::new(self.config.tx_fetch_concurrency));
        let mut pings = FuturesUnordered::new();
        for WirePeer::Address(address) in wire_peers {
            let semaphore = semaphore.clone();
            pings.push(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                self.ping_peer(address).await
            });
        }

        let mut ranked = Vec::new();
        while let Some(peer) = pings.next().await {
            if let Some(peer) = peer {
                ranked.push(peer);
            }
        }
        self.peers.replace(ranked).await;
        Ok(())
    }
}

impl HttpChainClient {
    async fn ping_peer(&self, address: String) -> Option<Peer> {
        let started = std::time::Instant::now();
        let url = format!("{}/info", address.trim_end_matches('/'));
        let response = self.http.get(&url).timeout(self.config.chunk_fetch_timeout).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let info: WireInfo = response.json().await.ok()?;
        Some(Peer { address, height: info.height, rtt_ms: started.elapsed().as_millis() as u64 })
    }
}
