// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

//! Lightweight in-memory fakes of `ChainClient` and `ChainDatabase`, shared by this
//! crate's unit tests. Real network/sqlite-backed integration coverage lives in the
//! `gateway_client` and `gateway_db` crates themselves; here we only need to drive the
//! importer/fetcher/repair state machines deterministically.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use gateway_client::{Block, BlockAndTxs, ChainClient, ClientError, Transaction};
use gateway_db::{ChainDatabase, DbError, DebugCounts};

#[derive(Default)]
pub(crate) struct FakeChainClient {
    blocks_by_height: Mutex<Vec<(u64, Block)>>,
    txs: Mutex<Vec<Transaction>>,
    unavailable_txs: Mutex<HashSet<String>>,
    tip: AtomicU64,
}

impl FakeChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_block(&self, block: Block) {
        let mut blocks = self.blocks_by_height.lock().unwrap();
        blocks.retain(|(h, _)| *h != block.height);
        blocks.push((block.height, block));
    }

    pub fn set_tx(&self, tx: Transaction) {
        let mut txs = self.txs.lock().unwrap();
        txs.retain(|t| t.id != tx.id);
        txs.push(tx);
    }

    pub fn mark_tx_unavailable(&self, id: &str) {
        self.unavailable_txs.lock().unwrap().insert(id.to_string());
    }

    pub fn set_tip(&self, height: u64) {
        self.tip.store(height, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn get_block_by_height(&self, height: u64) -> Result<Block, ClientError> {
        self.blocks_by_height
            .lock()
            .unwrap()
            .iter()
            .find(|(h, _)| *h == height)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| ClientError::NotFound { what: format!("block at height {height}") })
    }

    async fn get_block_by_id(&self, id: &str) -> Result<Block, ClientError> {
        self.blocks_by_height
            .lock()
            .unwrap()
            .iter()
            .find(|(_, b)| b.id == id)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| ClientError::NotFound { what: format!("block {id}") })
    }

    async fn get_tx(&self, id: &str) -> Result<Transaction, ClientError> {
        if self.unavailable_txs.lock().unwrap().contains(id) {
            return Err(ClientError::NotFound { what: format!("tx {id}") });
        }
        self.txs
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound { what: format!("tx {id}") })
    }

    async fn get_block_and_txs_by_height(&self, height: u64) -> Result<BlockAndTxs, ClientError> {
        let block = self.get_block_by_height(height).await?;
        let mut txs = Vec::new();
        let mut missing_tx_ids = Vec::new();
        for id in &block.txs {
            match self.get_tx(id).await {
                Ok(tx) => txs.push(tx),
                Err(_) => missing_tx_ids.push(id.clone()),
            }
        }
        Ok(BlockAndTxs { block, txs, missing_tx_ids })
    }

    async fn get_height(&self) -> Result<u64, ClientError> {
        Ok(self.tip.load(Ordering::SeqCst))
    }

    async fn get_chunk(&self, absolute_offset: u64) -> Result<Bytes, ClientError> {
        Err(ClientError::NotFound { what: format!("chunk at offset {absolute_offset}") })
    }

    async fn refresh_peers(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

struct MissingEntry {
    tx_id: String,
    first_seen_height: i64,
    seq: u64,
}

struct BlockRecord {
    id: String,
    tx_ids: Vec<String>,
}

#[derive(Default)]
struct FakeDbInner {
    blocks: std::collections::BTreeMap<i64, BlockRecord>,
    txs: HashSet<String>,
    missing: Vec<MissingEntry>,
    next_seq: u64,
}

#[derive(Default)]
pub(crate) struct FakeChainDatabase {
    inner: Mutex<FakeDbInner>,
}

impl FakeChainDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChainDatabase for FakeChainDatabase {
    async fn save_block_and_txs(
        &self,
        block: Block,
        txs: Vec<Transaction>,
        missing_tx_ids: Vec<String>,
    ) -> Result<(), DbError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.blocks.values().any(|b| b.id == block.id) {
            inner.blocks.insert(block.height as i64, BlockRecord { id: block.id.clone(), tx_ids: block.txs.clone() });
        }
        for tx in txs {
            inner.txs.insert(tx.id);
        }
        for tx_id in missing_tx_ids {
            if inner.missing.iter().any(|m| m.tx_id == tx_id) {
                continue;
            }
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.missing.push(MissingEntry { tx_id, first_seen_height: block.height as i64, seq });
        }
        Ok(())
    }

    async fn save_tx(&self, tx: Transaction) -> Result<(), DbError> {
        let mut inner = self.inner.lock().unwrap();
        inner.txs.insert(tx.id.clone());
        inner.missing.retain(|m| m.tx_id != tx.id);
        Ok(())
    }

    async fn get_max_height(&self) -> Result<i64, DbError> {
        Ok(self.inner.lock().unwrap().blocks.keys().next_back().copied().unwrap_or(-1))
    }

    async fn get_new_block_hash_by_height(&self, height: i64) -> Result<Option<String>, DbError> {
        Ok(self.inner.lock().unwrap().blocks.get(&height).map(|b| b.id.clone()))
    }

    async fn get_missing_tx_ids(&self, limit: i64) -> Result<Vec<String>, DbError> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<&MissingEntry> = inner.missing.iter().collect();
        entries.sort_by_key(|m| (m.seq, m.first_seen_height));
        Ok(entries.into_iter().take(limit.max(0) as usize).map(|m| m.tx_id.clone()).collect())
    }

    async fn reset_to_height(&self, height: i64) -> Result<(), DbError> {
        let mut inner = self.inner.lock().unwrap();
        let superseded_tx_ids: Vec<String> =
            inner.blocks.range((height + 1)..).flat_map(|(_, b)| b.tx_ids.clone()).collect();
        inner.blocks.retain(|h, _| *h <= height);
        for id in superseded_tx_ids {
            inner.txs.remove(&id);
        }
        inner.missing.retain(|m| m.first_seen_height <= height);
        Ok(())
    }

    async fn get_debug_info(&self) -> Result<DebugCounts, DbError> {
        let inner = self.inner.lock().unwrap();
        Ok(DebugCounts {
            new_blocks: inner.blocks.len() as i64,
            new_txs: inner.txs.len() as i64,
            missing_txs: inner.missing.len() as i64,
            max_height: inner.blocks.keys().next_back().copied().unwrap_or(-1),
        })
    }

    async fn touch_missing_tx(&self, tx_id: &str) -> Result<(), DbError> {
        let mut inner = self.inner.lock().unwrap();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        if let Some(entry) = inner.missing.iter_mut().find(|m| m.tx_id == tx_id) {
            entry.seq = seq;
        }
        Ok(())
    }
}

pub(crate) fn sample_id(tag: u8) -> String {
    let mut id = "a".repeat(43);
    id.replace_range(0..2, &format!("{:02}", tag % 100));
    id
}

pub(crate) fn sample_tx(tag: u8) -> Transaction {
    Transaction {
        id: sample_id(tag),
        owner: "owner".into(),
        target: "target".into(),
        quantity: "0".into(),
        reward: "0".into(),
        tags: vec![],
        data_size: 0,
        data_root: "root".into(),
        signature: "sig".into(),
    }
}

pub(crate) fn sample_block(height: u64, id_tag: u8, previous: Option<String>, tx_ids: Vec<String>) -> Block {
    Block { id: sample_id(id_tag), height, previous_block: previous, nonce: "nonce".into(), txs: tx_ids }
}
