// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::path::Path;

use async_trait::async_trait;
use diesel::{connection::SimpleConnection, prelude::*, r2d2::ConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use r2d2::Pool;
use gateway_client::{Block, Transaction};
use log::*;
use serde::Serialize;

use crate::{
    error::DbError,
    models::{BlockRow, NewBlockRow, NewMissingTxRow, NewTransactionRow},
    schema::{blocks, missing_txs, transactions},
};

const LOG_TARGET: &str = "gateway::db";

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DebugCounts {
    pub new_blocks: i64,
    pub new_txs: i64,
    pub missing_txs: i64,
    pub max_height: i64,
}

/// The transactional store of canonical chain metadata. All operations are serializable
/// from the caller's perspective: each is one `r2d2`-pooled connection running one
/// diesel transaction.
#[async_trait]
pub trait ChainDatabase: Send + Sync {
    async fn save_block_and_txs(
        &self,
        block: Block,
        txs: Vec<Transaction>,
        missing_tx_ids: Vec<String>,
    ) -> Result<(), DbError>;

    async fn save_tx(&self, tx: Transaction) -> Result<(), DbError>;

    async fn get_max_height(&self) -> Result<i64, DbError>;

    async fn get_new_block_hash_by_height(&self, height: i64) -> Result<Option<String>, DbError>;

    async fn get_missing_tx_ids(&self, limit: i64) -> Result<Vec<String>, DbError>;

    async fn reset_to_height(&self, height: i64) -> Result<(), DbError>;

    async fn get_debug_info(&self) -> Result<DebugCounts, DbError>;

    /// Bumps a journal entry's attempt counter and `last_attempt_at`, pushing it to the
    /// back of `get_missing_tx_ids`'s ordering. Called by the repair worker each time it
    /// re-queues an id; a no-op if the tx has since been ingested (the entry is gone).
    async fn touch_missing_tx(&self, tx_id: &str) -> Result<(), DbError>;
}

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Clone)]
pub struct SqliteChainDatabase {
    pool: SqlitePool,
}

impl SqliteChainDatabase {
    pub fn connect(database_path: impl AsRef<Path>) -> Result<Self, DbError> {
        if let Some(parent) = database_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| DbError::Migration(e.to_string()))?;
        }
        let manager = ConnectionManager::<SqliteConnection>::new(database_path.as_ref().to_string_lossy());
        let pool = Pool::builder().build(manager)?;

        let mut conn = pool.get()?;
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
            .map_err(|e| DbError::Migration(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| DbError::Migration(e.to_string()))?;
        info!(target: LOG_TARGET, "opened chain database at {}", database_path.as_ref().display());

        Ok(Self { pool })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, diesel::result::Error> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            conn.transaction(|conn| f(conn)).map_err(DbError::from)
        })
        .await?
    }
}

#[async_trait]
impl ChainDatabase for SqliteChainDatabase {
    async fn save_block_and_txs(
        &self,
        block: Block,
        txs: Vec<Transaction>,
        missing_tx_ids: Vec<String>,
    ) -> Result<(), DbError> {
        self.with_conn(move |conn| {
            let new_block = NewBlockRow::from_block(&block);
            diesel::insert_into(blocks::table).values(&new_block).on_conflict(blocks::id).do_nothing().execute(conn)?;

            for tx in &txs {
                let new_tx = NewTransactionRow::from_tx(tx);
                diesel::insert_into(transactions::table)
                    .values(&new_tx)
                    .on_conflict(transactions::id)
                    .do_nothing()
                    .execute(conn)?;
            }

            for tx_id in &missing_tx_ids {
                let row = NewMissingTxRow { tx_id, first_seen_height: block.height as i64 };
                diesel::insert_into(missing_txs::table)
                    .values(&row)
                    .on_conflict(missing_txs::tx_id)
                    .do_nothing()
                    .execute(conn)?;
            }

            Ok(())
        })
        .await
    }

    async fn save_tx(&self, tx: Transaction) -> Result<(), DbError> {
        self.with_conn(move |conn| {
            let new_tx = NewTransactionRow::from_tx(&tx);
            diesel::insert_into(transactions::table)
                .values(&new_tx)
                .on_conflict(transactions::id)
                .do_nothing()
                .execute(conn)?;

            diesel::delete(missing_txs::table.filter(missing_txs::tx_id.eq(&tx.id))).execute(conn)?;

            Ok(())
        })
        .await
    }

    async fn get_max_height(&self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let max: Option<i64> = blocks::table.select(diesel::dsl::max(blocks::height)).first(conn)?;
            Ok(max.unwrap_or(-1))
        })
        .await
    }

    async fn get_new_block_hash_by_height(&self, height: i64) -> Result<Option<String>, DbError> {
        self.with_conn(move |conn| {
            blocks::table.filter(blocks::height.eq(height)).select(blocks::id).first(conn).optional()
        })
        .await
    }

    async fn get_missing_tx_ids(&self, limit: i64) -> Result<Vec<String>, DbError> {
        self.with_conn(move |conn| {
            missing_txs::table
                .order((missing_txs::last_attempt_at.asc(), missing_txs::first_seen_height.asc()))
                .limit(limit)
                .select(missing_txs::tx_id)
                .load(conn)
        })
        .await
    }

    async fn reset_to_height(&self, height: i64) -> Result<(), DbError> {
        self.with_conn(move |conn| {
            let superseded: Vec<BlockRow> = blocks::table.filter(blocks::height.gt(height)).load(conn)?;
            let superseded_tx_ids: Vec<String> = superseded.iter().flat_map(|b| b.tx_ids()).collect();

            if !superseded_tx_ids.is_empty() {
                diesel::delete(transactions::table.filter(transactions::id.eq_any(&superseded_tx_ids))).execute(conn)?;
            }
            diesel::delete(missing_txs::table.filter(missing_txs::first_seen_height.gt(height))).execute(conn)?;
            diesel::delete(blocks::table.filter(blocks::height.gt(height))).execute(conn)?;

            Ok(())
        })
        .await
    }

    async fn get_debug_info(&self) -> Result<DebugCounts, DbError> {
        self.with_conn(|conn| {
            let new_blocks: i64 = blocks::table.count().get_result(conn)?;
            let new_txs: i64 = transactions::table.count().get_result(conn)?;
            let missing_txs: i64 = missing_txs::table.count().get_result(conn)?;
            let max_height: Option<i64> = blocks::table.select(diesel::dsl::max(blocks::height)).first(conn)?;
            Ok(DebugCounts { new_blocks, new_txs, missing_txs, max_height: max_height.unwrap_or(-1) })
        })
        .await
    }

    async fn touch_missing_tx(&self, tx_id: &str) -> Result<(), DbError> {
        let tx_id = tx_id.to_string();
        let now = chrono::Utc::now().naive_utc();
        self.with_conn(move |conn| {
            diesel::update(missing_txs::table.filter(missing_txs::tx_id.eq(&tx_id)))
                .set((missing_txs::attempts.eq(missing_txs::attempts + 1), missing_txs::last_attempt_at.eq(now)))
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}
