// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::ClientError,
    types::{Block, BlockAndTxs, Transaction},
};

/// Everything the block importer, tx fetcher, and tx chunks data source need from the
/// trusted upstream node. A single `HttpChainClient` backs the real gateway; tests drive
/// the ingest pipeline against lightweight in-memory fakes of this trait instead of a
/// live node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_block_by_height(&self, height: u64) -> Result<Block, ClientError>;

    async fn get_block_by_id(&self, id: &str) -> Result<Block, ClientError>;

    async fn get_tx(&self, id: &str) -> Result<Transaction, ClientError>;

    /// Returns the block plus every tx whose synchronous fetch succeeded within the
    /// per-block deadline; everything else lands in `missing_tx_ids`. Never fails because
    /// of an individual tx; only a failure to fetch the block itself is propagated.
    async fn get_block_and_txs_by_height(&self, height: u64) -> Result<BlockAndTxs, ClientError>;

    async fn get_height(&self) -> Result<u64, ClientError>;

    async fn get_chunk(&self, absolute_offset: u64) -> Result<Bytes, ClientError>;

    /// Pings the trusted node's peer list and caches a ranked subset. Intended to be
    /// driven by a periodic background task; a no-op implementation is valid for clients
    /// that never need peer fan-out (e.g. test fakes).
    async fn refresh_peers(&self) -> Result<(), ClientError>;
}
