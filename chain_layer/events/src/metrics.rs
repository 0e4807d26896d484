// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters capability, constructed once at bootstrap and cloned (cheap,
/// `Arc`-backed by the caller) into every long-running component.
///
/// Exposition in Prometheus text format lives outside this crate; this is just the
/// in-process counting primitive the exposition layer reads from.
#[derive(Debug, Default)]
pub struct Metrics {
    errors_total: AtomicU64,
    uncaught_exceptions_total: AtomicU64,
    blocks_imported_total: AtomicU64,
    txs_fetched_total: AtomicU64,
    txs_imported_total: AtomicU64,
    txs_repaired_total: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_errors(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_uncaught_exceptions(&self) {
        self.uncaught_exceptions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_blocks_imported(&self) {
        self.blocks_imported_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_txs_fetched(&self) {
        self.txs_fetched_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_txs_imported(&self) {
        self.txs_imported_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_txs_repaired(&self) {
        self.txs_repaired_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn errors_total(&self) -> u64 {
        self.errors_total.load(Ordering::Relaxed)
    }

    pub fn uncaught_exceptions_total(&self) -> u64 {
        self.uncaught_exceptions_total.load(Ordering::Relaxed)
    }

    pub fn blocks_imported_total(&self) -> u64 {
        self.blocks_imported_total.load(Ordering::Relaxed)
    }

    pub fn txs_fetched_total(&self) -> u64 {
        self.txs_fetched_total.load(Ordering::Relaxed)
    }

    pub fn txs_imported_total(&self) -> u64 {
        self.txs_imported_total.load(Ordering::Relaxed)
    }

    pub fn txs_repaired_total(&self) -> u64 {
        self.txs_repaired_total.load(Ordering::Relaxed)
    }
}
