// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to assemble configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("STOP_HEIGHT ({stop_height}) must be greater than START_HEIGHT ({start_height})")]
    StopBeforeStart { start_height: u64, stop_height: u64 },
}
