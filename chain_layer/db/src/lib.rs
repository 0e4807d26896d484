// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

mod db;
mod error;
mod models;
mod schema;

pub use db::{ChainDatabase, DebugCounts, SqliteChainDatabase, MIGRATIONS};
pub use error::DbError;
