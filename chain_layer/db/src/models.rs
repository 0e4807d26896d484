// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use chrono::NaiveDateTime;
use diesel::prelude::*;
use gateway_client::{Block, Tag, Transaction};

use crate::schema::{blocks, missing_txs, transactions};

#[derive(Debug, Queryable)]
pub struct BlockRow {
    pub id: String,
    pub height: i64,
    pub previous_block: Option<String>,
    pub nonce: String,
    pub tx_ids: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = blocks)]
pub struct NewBlockRow<'a> {
    pub id: &'a str,
    pub height: i64,
    pub previous_block: Option<&'a str>,
    pub nonce: &'a str,
    pub tx_ids: String,
}

impl<'a> NewBlockRow<'a> {
    pub fn from_block(block: &'a Block) -> Self {
        Self {
            id: &block.id,
            height: block.height as i64,
            previous_block: block.previous_block.as_deref(),
            nonce: &block.nonce,
            tx_ids: serde_json::to_string(&block.txs).expect("tx ids are always serializable"),
        }
    }
}

impl BlockRow {
    pub fn tx_ids(&self) -> Vec<String> {
        serde_json::from_str(&self.tx_ids).unwrap_or_default()
    }
}

#[derive(Debug, Queryable)]
pub struct TransactionRow {
    pub id: String,
    pub owner: String,
    pub target: String,
    pub quantity: String,
    pub reward: String,
    pub tags: String,
    pub data_size: i64,
    pub data_root: String,
    pub signature: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transactions)]
pub struct NewTransactionRow<'a> {
    pub id: &'a str,
    pub owner: &'a str,
    pub target: &'a str,
    pub quantity: &'a str,
    pub reward: &'a str,
    pub tags: String,
    pub data_size: i64,
    pub data_root: &'a str,
    pub signature: &'a str,
}

impl<'a> NewTransactionRow<'a> {
    pub fn from_tx(tx: &'a Transaction) -> Self {
        Self {
            id: &tx.id,
            owner: &tx.owner,
            target: &tx.target,
            quantity: &tx.quantity,
            reward: &tx.reward,
            tags: serde_json::to_string(&tx.tags).expect("tags are always serializable"),
            data_size: tx.data_size as i64,
            data_root: &tx.data_root,
            signature: &tx.signature,
        }
    }
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        let tags: Vec<Tag> = serde_json::from_str(&row.tags).unwrap_or_default();
        Transaction {
            id: row.id,
            owner: row.owner,
            target: row.target,
            quantity: row.quantity,
            reward: row.reward,
            tags,
            data_size: row.data_size as u64,
            data_root: row.data_root,
            signature: row.signature,
        }
    }
}

#[derive(Debug, Queryable)]
pub struct MissingTxRow {
    pub tx_id: String,
    pub first_seen_height: i64,
    pub attempts: i32,
    pub last_attempt_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = missing_txs)]
pub struct NewMissingTxRow<'a> {
    pub tx_id: &'a str,
    pub first_seen_height: i64,
}
