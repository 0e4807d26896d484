// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

#[derive(Debug, thiserror::Error)]
pub enum ImporterError {
    #[error("maximum fork depth exceeded while repairing to height {height}")]
    MaximumForkDepthExceeded { height: u64 },

    #[error("chain client error: {0}")]
    Client(#[from] gateway_client::ClientError),

    #[error("chain database error: {0}")]
    Db(#[from] gateway_db::DbError),

    #[error("importer was stopped")]
    Cancelled,
}

impl ImporterError {
    /// Only `MaximumForkDepthExceeded` halts the importer; every other variant is retried
    /// with backoff at the same height.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ImporterError::MaximumForkDepthExceeded { .. })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("tx fetch queue is full")]
pub struct QueueFull;
