// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use gateway_client::{Block, Tag, Transaction};
use gateway_db::{ChainDatabase, SqliteChainDatabase};

fn id(tag: u8) -> String {
    let mut s = "a".repeat(43);
    s.replace_range(0..1, &(tag % 10).to_string());
    s
}

fn sample_tx(tag: u8) -> Transaction {
    Transaction {
        id: id(tag),
        owner: "owner".into(),
        target: "target".into(),
        quantity: "0".into(),
        reward: "0".into(),
        tags: vec![Tag { name: "app".into(), value: "gateway".into() }],
        data_size: 10,
        data_root: "root".into(),
        signature: "sig".into(),
    }
}

fn sample_block(height: u64, id_tag: u8, previous: Option<String>, tx_ids: Vec<String>) -> Block {
    Block { id: id(id_tag), height, previous_block: previous, nonce: "nonce".into(), txs: tx_ids }
}

async fn open_db() -> SqliteChainDatabase {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("core.db");
    // leak the tempdir so the file isn't removed before the test finishes
    std::mem::forget(dir);
    SqliteChainDatabase::connect(path).unwrap()
}

#[tokio::test]
async fn empty_db_reports_max_height_negative_one() {
    let db = open_db().await;
    assert_eq!(db.get_max_height().await.unwrap(), -1);
}

#[tokio::test]
async fn save_block_and_txs_updates_debug_counts() {
    let db = open_db().await;
    let tx = sample_tx(1);
    let block = sample_block(0, 2, None, vec![tx.id.clone()]);

    db.save_block_and_txs(block.clone(), vec![tx], vec![id(3)]).await.unwrap();

    let counts = db.get_debug_info().await.unwrap();
    assert_eq!(counts.new_blocks, 1);
    assert_eq!(counts.new_txs, 1);
    assert_eq!(counts.missing_txs, 1);
    assert_eq!(counts.max_height, 0);
    assert_eq!(db.get_max_height().await.unwrap(), 0);
}

#[tokio::test]
async fn save_block_and_txs_is_idempotent_on_block_id() {
    let db = open_db().await;
    let tx = sample_tx(4);
    let block = sample_block(5, 5, None, vec![tx.id.clone()]);

    db.save_block_and_txs(block.clone(), vec![tx.clone()], vec![]).await.unwrap();
    db.save_block_and_txs(block, vec![tx], vec![]).await.unwrap();

    let counts = db.get_debug_info().await.unwrap();
    assert_eq!(counts.new_blocks, 1);
    assert_eq!(counts.new_txs, 1);
}

#[tokio::test]
async fn save_tx_clears_matching_journal_entry() {
    let db = open_db().await;
    let tx = sample_tx(6);
    let block = sample_block(7, 7, None, vec![tx.id.clone()]);
    db.save_block_and_txs(block, vec![], vec![tx.id.clone()]).await.unwrap();

    let before = db.get_debug_info().await.unwrap();
    assert_eq!(before.missing_txs, 1);
    assert_eq!(before.new_txs, 0);

    db.save_tx(tx).await.unwrap();

    let after = db.get_debug_info().await.unwrap();
    assert_eq!(after.missing_txs, 0);
    assert_eq!(after.new_txs, 1);
}

#[tokio::test]
async fn get_new_block_hash_by_height_round_trips() {
    let db = open_db().await;
    let block = sample_block(42, 8, None, vec![]);
    db.save_block_and_txs(block.clone(), vec![], vec![]).await.unwrap();

    assert_eq!(db.get_new_block_hash_by_height(42).await.unwrap(), Some(block.id));
    assert_eq!(db.get_new_block_hash_by_height(41).await.unwrap(), None);
}

#[tokio::test]
async fn get_missing_tx_ids_orders_by_last_attempt_then_first_seen() {
    let db = open_db().await;
    let block_a = sample_block(1, 1, None, vec![]);
    db.save_block_and_txs(block_a, vec![], vec![id(2)]).await.unwrap();
    let block_b = sample_block(2, 3, Some(id(1)), vec![]);
    db.save_block_and_txs(block_b, vec![], vec![id(4)]).await.unwrap();

    let ids = db.get_missing_tx_ids(10).await.unwrap();
    assert_eq!(ids, vec![id(2), id(4)]);
}

#[tokio::test]
async fn touch_missing_tx_moves_entry_to_back_of_ordering() {
    let db = open_db().await;
    let block_a = sample_block(1, 1, None, vec![]);
    db.save_block_and_txs(block_a, vec![], vec![id(2)]).await.unwrap();
    let block_b = sample_block(2, 3, Some(id(1)), vec![]);
    db.save_block_and_txs(block_b, vec![], vec![id(4)]).await.unwrap();

    assert_eq!(db.get_missing_tx_ids(10).await.unwrap(), vec![id(2), id(4)]);

    db.touch_missing_tx(&id(2)).await.unwrap();

    assert_eq!(db.get_missing_tx_ids(10).await.unwrap(), vec![id(4), id(2)]);
}

#[tokio::test]
async fn touch_missing_tx_on_already_ingested_id_is_a_no_op() {
    let db = open_db().await;
    db.touch_missing_tx(&id(9)).await.unwrap();
}

#[tokio::test]
async fn reset_to_height_deletes_superseded_blocks_and_their_txs_and_journal() {
    let db = open_db().await;
    let tx1 = sample_tx(1);
    let block1 = sample_block(1, 2, None, vec![tx1.id.clone()]);
    db.save_block_and_txs(block1.clone(), vec![tx1], vec![]).await.unwrap();

    let tx2 = sample_tx(5);
    let block2 = sample_block(2, 6, Some(block1.id.clone()), vec![tx2.id.clone()]);
    db.save_block_and_txs(block2, vec![tx2], vec![id(7)]).await.unwrap();

    assert_eq!(db.get_max_height().await.unwrap(), 2);

    db.reset_to_height(1).await.unwrap();

    assert_eq!(db.get_max_height().await.unwrap(), 1);
    let counts = db.get_debug_info().await.unwrap();
    assert_eq!(counts.new_blocks, 1);
    assert_eq!(counts.new_txs, 1);
    assert_eq!(counts.missing_txs, 0);
}
