// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};

pub const ID_LEN: usize = 43;

pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// A block on the canonical chain, as reported by the trusted node.
///
/// `height` is monotone along a chain but re-usable across forks: it is the caller's
/// responsibility (the block importer) to treat it as a position, not an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub height: u64,
    pub previous_block: Option<String>,
    pub nonce: String,
    pub txs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub owner: String,
    pub target: String,
    pub quantity: String,
    pub reward: String,
    pub tags: Vec<Tag>,
    pub data_size: u64,
    pub data_root: String,
    pub signature: String,
}

/// Result of `ChainClient::get_block_and_txs_by_height`: every tx that could be fetched
/// synchronously within the per-block deadline, plus the ids of the ones that couldn't.
#[derive(Debug, Clone)]
pub struct BlockAndTxs {
    pub block: Block,
    pub txs: Vec<Transaction>,
    pub missing_tx_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub address: String,
    pub height: u64,
    pub rtt_ms: u64,
}

pub(crate) fn validate_block(block: &Block) -> bool {
    let previous_ok = match &block.previous_block {
        Some(id) => is_valid_id(id),
        None => true,
    };
    is_valid_id(&block.id) && previous_ok && block.txs.iter().all(|id| is_valid_id(id))
}

pub(crate) fn validate_tx(tx: &Transaction) -> bool {
    is_valid_id(&tx.id) && !tx.data_root.is_empty()
}
