// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("id `{0}` is not a valid 43-character base64url identifier")]
    InvalidId(String),
}
