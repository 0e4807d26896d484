// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use gateway_stores::{StoreError, UpstreamSimulatedError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("all upstream sources exhausted for {what}")]
    UpstreamUnavailable { what: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{what} failed schema validation")]
    Invalid { what: String },

    #[error("simulated failure: {0}")]
    Simulated(#[from] UpstreamSimulatedError),

    #[error("local cache error: {0}")]
    Store(#[from] StoreError),

    #[error("request to {url} timed out")]
    Timeout { url: String },
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Simulated(_) | ClientError::Timeout { .. } | ClientError::UpstreamUnavailable { .. })
    }
}
