// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

//! JSON shapes returned by the trusted node / peers, and their conversion into the
//! crate's domain types (`types::Block`, `types::Transaction`).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

use crate::types::{Block, Tag, Transaction};

#[derive(Debug, Deserialize)]
pub struct WireTag {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct WireBlock {
    pub indep_hash: String,
    pub height: u64,
    pub previous_block: Option<String>,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub txs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireTransaction {
    pub id: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub reward: String,
    #[serde(default)]
    pub tags: Vec<WireTag>,
    #[serde(default)]
    pub data_size: String,
    pub data_root: String,
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct WireInfo {
    pub height: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WirePeer {
    Address(String),
}

fn decode_b64(field: &str) -> String {
    URL_SAFE_NO_PAD
        .decode(field)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

impl From<WireBlock> for Block {
    fn from(w: WireBlock) -> Self {
        Block { id: w.indep_hash, height: w.height, previous_block: w.previous_block, nonce: w.nonce, txs: w.txs }
    }
}

impl From<WireTransaction> for Transaction {
    fn from(w: WireTransaction) -> Self {
        let tags = w.tags.into_iter().map(|t| Tag { name: decode_b64(&t.name), value: decode_b64(&t.value) }).collect();
        Transaction {
            id: w.id,
            owner: w.owner,
            target: w.target,
            quantity: w.quantity,
            reward: w.reward,
            tags,
            data_size: w.data_size.parse().unwrap_or(0),
            data_root: w.data_root,
            signature: w.signature,
        }
    }
}
