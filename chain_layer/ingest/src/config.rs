// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub start_height: u64,
    pub stop_height: Option<u64>,
    pub height_polling_interval: Duration,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self { start_height: 0, stop_height: None, height_polling_interval: Duration::from_secs(5) }
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub queue_depth: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self { queue_depth: 1000 }
    }
}

#[derive(Debug, Clone)]
pub struct RepairConfig {
    pub interval: Duration,
    pub batch_size: i64,
    pub cooldown: Duration,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(60), batch_size: 100, cooldown: Duration::from_secs(300) }
    }
}
