// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use gateway_client::{ChainClient, ClientConfig, HttpChainClient};
use gateway_stores::ContentStore;
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn sample_id(tag: u8) -> String {
    let mut id = "a".repeat(43);
    id.replace_range(0..1, &(tag % 10).to_string());
    id
}

fn make_client(base_url: String, block_dir: &tempfile::TempDir, tx_dir: &tempfile::TempDir) -> HttpChainClient {
    let config = ClientConfig { trusted_node_url: base_url, ..ClientConfig::default() };
    HttpChainClient::new(config, ContentStore::new(block_dir.path()), ContentStore::new(tx_dir.path()))
}

#[tokio::test]
async fn fetches_block_by_height_and_caches_it() {
    let server = MockServer::start().await;
    let block_id = sample_id(1);
    Mock::given(method("GET"))
        .and(path("/block/height/10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indep_hash": block_id,
            "height": 10,
            "previous_block": sample_id(2),
            "nonce": "abc",
            "txs": [],
        })))
        .mount(&server)
        .await;

    let block_dir = tempfile::tempdir().unwrap();
    let tx_dir = tempfile::tempdir().unwrap();
    let client = make_client(server.uri(), &block_dir, &tx_dir);

    let block = client.get_block_by_height(10).await.unwrap();
    assert_eq!(block.id, block_id);
    assert_eq!(block.height, 10);

    // write-through: a subsequent get_block_by_id must be served from the cache, not the
    // (now-unmocked) network.
    let fetched_by_id = client.get_block_by_id(&block_id).await.unwrap();
    assert_eq!(fetched_by_id, block);
}

#[tokio::test]
async fn fetches_tx_and_caches_it() {
    let server = MockServer::start().await;
    let tx_id = sample_id(3);
    Mock::given(method("GET"))
        .and(path(format!("/tx/{tx_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": tx_id,
            "owner": "owner",
            "target": "",
            "quantity": "0",
            "reward": "0",
            "tags": [],
            "data_size": "128",
            "data_root": "root",
            "signature": "sig",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let block_dir = tempfile::tempdir().unwrap();
    let tx_dir = tempfile::tempdir().unwrap();
    let client = make_client(server.uri(), &block_dir, &tx_dir);

    let tx = client.get_tx(&tx_id).await.unwrap();
    assert_eq!(tx.data_size, 128);

    // second call is served from cache; wiremock's `.expect(1)` would fail the test on drop
    // if the network were hit twice.
    let tx_again = client.get_tx(&tx_id).await.unwrap();
    assert_eq!(tx_again, tx);
}

#[tokio::test]
async fn not_found_tx_surfaces_as_not_found_with_no_peers() {
    let server = MockServer::start().await;
    let tx_id = sample_id(4);
    Mock::given(method("GET")).and(path(format!("/tx/{tx_id}"))).respond_with(ResponseTemplate::new(404)).mount(&server).await;

    let block_dir = tempfile::tempdir().unwrap();
    let tx_dir = tempfile::tempdir().unwrap();
    let client = make_client(server.uri(), &block_dir, &tx_dir);

    let err = client.get_tx(&tx_id).await.unwrap_err();
    assert!(matches!(err, gateway_client::ClientError::NotFound { .. }));
}

#[tokio::test]
async fn transient_trusted_node_failure_falls_back_to_peer() {
    let trusted = MockServer::start().await;
    let peer = MockServer::start().await;
    let tx_id = sample_id(9);

    Mock::given(method("GET")).and(path(format!("/tx/{tx_id}"))).respond_with(ResponseTemplate::new(500)).mount(&trusted).await;
    Mock::given(method("GET"))
        .and(path("/peers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([peer.uri()])))
        .mount(&trusted)
        .await;
    Mock::given(method("GET")).and(path("/info")).respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "height": 5u64,
    }))).mount(&peer).await;
    Mock::given(method("GET"))
        .and(path(format!("/tx/{tx_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": tx_id,
            "owner": "owner",
            "target": "",
            "quantity": "0",
            "reward": "0",
            "tags": [],
            "data_size": "4",
            "data_root": "root",
            "signature": "sig",
        })))
        .mount(&peer)
        .await;

    let block_dir = tempfile::tempdir().unwrap();
    let tx_dir = tempfile::tempdir().unwrap();
    let client = make_client(trusted.uri(), &block_dir, &tx_dir);

    client.refresh_peers().await.unwrap();
    let tx = client.get_tx(&tx_id).await.unwrap();
    assert_eq!(tx.id, tx_id);
}

#[tokio::test]
async fn get_height_reads_info_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).and(path("/info")).respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "height": 982575u64,
    }))).mount(&server).await;

    let block_dir = tempfile::tempdir().unwrap();
    let tx_dir = tempfile::tempdir().unwrap();
    let client = make_client(server.uri(), &block_dir, &tx_dir);

    assert_eq!(client.get_height().await.unwrap(), 982575);
}

#[tokio::test]
async fn block_and_txs_by_height_collects_missing_ids() {
    let server = MockServer::start().await;
    let block_id = sample_id(5);
    let present_tx = sample_id(6);
    let missing_tx = sample_id(7);

    Mock::given(method("GET"))
        .and(path("/block/height/20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indep_hash": block_id,
            "height": 20,
            "previous_block": sample_id(8),
            "nonce": "n",
            "txs": [present_tx, missing_tx],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/tx/{present_tx}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": present_tx,
            "owner": "o",
            "target": "t",
            "quantity": "0",
            "reward": "0",
            "tags": [],
            "data_size": "0",
            "data_root": "root",
            "signature": "sig",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET")).and(path(format!("/tx/{missing_tx}"))).respond_with(ResponseTemplate::new(404)).mount(&server).await;

    let block_dir = tempfile::tempdir().unwrap();
    let tx_dir = tempfile::tempdir().unwrap();
    let client = make_client(server.uri(), &block_dir, &tx_dir);

    let result = client.get_block_and_txs_by_height(20).await.unwrap();
    assert_eq!(result.txs.len(), 1);
    assert_eq!(result.txs[0].id, present_tx);
    assert_eq!(result.missing_tx_ids, vec![missing_tx]);
}
