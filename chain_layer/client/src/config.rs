// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub trusted_node_url: String,
    pub skip_cache: bool,
    pub simulated_request_failure_rate: f64,
    pub tx_fetch_concurrency: usize,
    pub tx_fetch_timeout: Duration,
    pub block_fetch_timeout: Duration,
    pub chunk_fetch_timeout: Duration,
    pub peer_refresh_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            trusted_node_url: "https://arweave.net".to_string(),
            skip_cache: false,
            simulated_request_failure_rate: 0.0,
            tx_fetch_concurrency: 32,
            tx_fetch_timeout: Duration::from_secs(10),
            block_fetch_timeout: Duration::from_secs(15),
            chunk_fetch_timeout: Duration::from_secs(10),
            peer_refresh_interval: Duration::from_secs(600),
        }
    }
}
