// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use gateway_client::Transaction;

/// The closed set of topics the importer (E) wires to the tx fetcher (F) and tx importer
/// (G). A tagged-variant enum stands in for the source's named-topic emitter since the
/// topic set never grows.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// A block was committed with a tx id it references but couldn't fetch synchronously.
    /// Observable only after the owning block is committed to the database.
    BlockTxFetchFailed { tx_id: String },
    /// A previously-missing tx was fetched and is ready to be persisted.
    TxFetched { tx: Transaction },
}

impl GatewayEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            GatewayEvent::BlockTxFetchFailed { .. } => "block-tx-fetch-failed",
            GatewayEvent::TxFetched { .. } => "tx-fetched",
        }
    }
}
