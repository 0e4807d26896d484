// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use async_stream::try_stream;
use bytes::Bytes;
use futures::Stream;
use gateway_client::{ChainClient, ClientError};
use log::*;

use crate::error::DataStreamError;

const LOG_TARGET: &str = "gateway::data_source::chunks";

/// Chunks are addressed by their cumulative position within the tx's own reconstructed
/// byte stream (0-indexed), not a chain-wide position; `ChainClient::get_chunk` resolves
/// that into the underlying wire request.
const CHUNK_SIZE: u64 = 256 * 1024;

/// Reassembles a transaction's payload on demand from the chain client's chunk API.
/// Cheap to construct; one instance can stream any number of tx ids.
pub struct TxChunksDataSource {
    client: Arc<dyn ChainClient>,
}

impl TxChunksDataSource {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    /// Lazily produces the tx's payload bytes, one chunk at a time, as the consumer
    /// polls. Dropping the stream between chunks cancels the fetch cleanly; no partial
    /// chunk is ever handed to the caller without being accounted for against `data_size`.
    pub fn stream(&self, tx_id: String) -> impl Stream<Item = Result<Bytes, DataStreamError>> + Send + 'static {
        let client = self.client.clone();
        try_stream! {
            let tx = match client.get_tx(&tx_id).await {
                Ok(tx) => tx,
                Err(ClientError::NotFound { .. }) => Err(DataStreamError::TxNotFound { id: tx_id.clone() })?,
                Err(e) => Err(DataStreamError::Client(e))?,
            };

            debug!(
                target: LOG_TARGET,
                "streaming {} bytes for tx {tx_id} (data_root {})", tx.data_size, tx.data_root
            );

            let mut delivered = 0u64;
            let mut offset = 0u64;
            while offset < tx.data_size {
                let chunk = client.get_chunk(offset).await?;
                let remaining = tx.data_size - delivered;
                let chunk = if (chunk.len() as u64) > remaining { chunk.slice(0..remaining as usize) } else { chunk };
                delivered += chunk.len() as u64;
                offset += CHUNK_SIZE;
                yield chunk;
            }

            if delivered != tx.data_size {
                Err(DataStreamError::LengthMismatch { id: tx_id, expected: tx.data_size, actual: delivered })?;
            }
        }
    }
}
