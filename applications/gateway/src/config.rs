// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use gateway_client::ClientConfig;
use gateway_ingest::{FetcherConfig, ImporterConfig, RepairConfig};
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Parser)]
#[command(name = "gateway", about = "Indexes a trusted chain node into a local SQLite mirror and serves it over HTTP")]
pub struct Cli {
    /// Optional TOML config file layered beneath process environment variables.
    #[arg(long, env = "GATEWAY_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

/// Assembled once at startup by layering compiled-in defaults, an optional config file,
/// then the process environment, and then split into the narrower per-component config
/// records each worker actually takes. No component reads the environment directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub start_height: u64,
    pub stop_height: Option<u64>,
    pub trusted_node_url: String,
    pub skip_cache: bool,
    pub port: u16,
    pub simulated_request_failure_rate: f64,
    pub height_polling_interval_ms: u64,
    pub tx_fetch_concurrency: usize,
    pub tx_queue_depth: usize,
    pub repair_interval_ms: u64,
    pub repair_batch_size: i64,
    pub repair_cooldown_ms: u64,
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            start_height: 0,
            stop_height: None,
            trusted_node_url: "https://arweave.net".to_string(),
            skip_cache: false,
            port: 4000,
            simulated_request_failure_rate: 0.0,
            height_polling_interval_ms: 5_000,
            tx_fetch_concurrency: 32,
            tx_queue_depth: 1_000,
            repair_interval_ms: 60_000,
            repair_batch_size: 100,
            repair_cooldown_ms: 300_000,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl AppConfig {
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = &cli.config_file {
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }
        let source = builder.add_source(config::Environment::default()).build()?;
        let config: AppConfig = source.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(stop_height) = self.stop_height {
            if stop_height <= self.start_height {
                return Err(ConfigError::StopBeforeStart { start_height: self.start_height, stop_height });
            }
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            trusted_node_url: self.trusted_node_url.clone(),
            skip_cache: self.skip_cache,
            simulated_request_failure_rate: self.simulated_request_failure_rate,
            tx_fetch_concurrency: self.tx_fetch_concurrency,
            ..ClientConfig::default()
        }
    }

    pub fn importer_config(&self) -> ImporterConfig {
        ImporterConfig {
            start_height: self.start_height,
            stop_height: self.stop_height,
            height_polling_interval: Duration::from_millis(self.height_polling_interval_ms),
        }
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig { queue_depth: self.tx_queue_depth }
    }

    pub fn repair_config(&self) -> RepairConfig {
        RepairConfig {
            interval: Duration::from_millis(self.repair_interval_ms),
            batch_size: self.repair_batch_size,
            cooldown: Duration::from_millis(self.repair_cooldown_ms),
        }
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("sqlite").join("core.db")
    }

    pub fn block_store_dir(&self) -> PathBuf {
        self.data_dir.join("headers").join("partial-blocks")
    }

    pub fn tx_store_dir(&self) -> PathBuf {
        self.data_dir.join("headers").join("partial-txs")
    }
}
