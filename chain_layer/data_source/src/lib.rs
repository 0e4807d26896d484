// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

mod chunks;
mod error;

pub use chunks::TxChunksDataSource;
pub use error::DataStreamError;
