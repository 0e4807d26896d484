// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

mod client;
mod config;
mod error;
mod http_client;
mod peers;
pub mod types;
mod wire;

pub use client::ChainClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use http_client::HttpChainClient;
pub use peers::PeerRanking;
pub use types::{Block, BlockAndTxs, Peer, Tag, Transaction};
