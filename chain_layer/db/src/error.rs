// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("failed to acquire pooled connection: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database worker task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to run embedded migrations: {0}")]
    Migration(String),
}
