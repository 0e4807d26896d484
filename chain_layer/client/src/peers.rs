// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::types::Peer;

/// Ranked subset of the trusted node's peer list, used for fan-out when the trusted node
/// itself can't serve a tx or chunk request.
///
/// Ranking key is `(height desc, rtt asc)`; the set is refreshed every `ttl` or on demand
/// after consecutive failures.
pub struct PeerRanking {
    ttl: Duration,
    state: RwLock<PeerState>,
}

struct PeerState {
    peers: Vec<Peer>,
    last_refreshed: Option<Instant>,
}

impl PeerRanking {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, state: RwLock::new(PeerState { peers: Vec::new(), last_refreshed: None }) }
    }

    pub async fn snapshot(&self) -> Vec<Peer> {
        self.state.read().await.peers.clone()
    }

    pub async fn is_stale(&self) -> bool {
        match self.state.read().await.last_refreshed {
            Some(at) => at.elapsed() >= self.ttl,
            None => true,
        }
    }

    pub async fn replace(&self, mut peers: Vec<Peer>) {
        peers.sort_by(|a, b| b.height.cmp(&a.height).then(a.rtt_ms.cmp(&b.rtt_ms)));
        let mut state = self.state.write().await;
        state.peers = peers;
        state.last_refreshed = Some(Instant::now());
    }

    pub async fn mark_refresh_failed(&self) {
        // Force the next call to consult is_stale() to trigger a retry soon rather than
        // waiting a full ttl.
        let mut state = self.state.write().await;
        if let Some(at) = state.last_refreshed {
            state.last_refreshed = Some(at - self.ttl.max(Duration::from_secs(1)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ranks_by_height_desc_then_rtt_asc() {
        let ranking = PeerRanking::new(Duration::from_secs(600));
        ranking
            .replace(vec![
                Peer { address: "a".into(), height: 10, rtt_ms: 50 },
                Peer { address: "b".into(), height: 20, rtt_ms: 100 },
                Peer { address: "c".into(), height: 20, rtt_ms: 10 },
            ])
            .await;
        let snapshot = ranking.snapshot().await;
        assert_eq!(snapshot[0].address, "c");
        assert_eq!(snapshot[1].address, "b");
        assert_eq!(snapshot[2].address, "a");
    }

    #[tokio::test]
    async fn starts_stale() {
        let ranking = PeerRanking::new(Duration::from_secs(600));
        assert!(ranking.is_stale().await);
        ranking.replace(vec![]).await;
        assert!(!ranking.is_stale().await);
    }
}
