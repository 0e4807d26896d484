// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

#[derive(Debug, thiserror::Error)]
pub enum DataStreamError {
    #[error("tx {id} not found")]
    TxNotFound { id: String },

    #[error("chain client error while streaming chunks: {0}")]
    Client(#[from] gateway_client::ClientError),

    #[error("tx {id} advertises data_size {expected} but {actual} bytes were streamed")]
    LengthMismatch { id: String, expected: u64, actual: u64 },
}
