// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use log::*;
use tokio::sync::broadcast;

use crate::event::GatewayEvent;

const LOG_TARGET: &str = "gateway::events::bus";

/// Synchronous-dispatch pub/sub over the closed `GatewayEvent` topic set. Subscribers
/// must be non-blocking: in practice they enqueue into the tx fetcher or tx importer and
/// return immediately.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes on the caller's own thread of execution; dispatch to subscribers is
    /// synchronous with respect to channel delivery (the `tokio::sync::broadcast` queue),
    /// not with respect to subscriber processing.
    pub fn publish(&self, event: GatewayEvent) {
        // No active subscribers is not an error: unknown/unsubscribed topics are inert.
        if self.sender.send(event.clone()).is_err() {
            debug!(target: LOG_TARGET, "published {} with no active subscribers", event.topic());
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(GatewayEvent::BlockTxFetchFailed { tx_id: "abc".into() });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic(), "block-tx-fetch-failed");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_inert() {
        let bus = EventBus::default();
        bus.publish(GatewayEvent::BlockTxFetchFailed { tx_id: "abc".into() });
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_the_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.publish(GatewayEvent::BlockTxFetchFailed { tx_id: "abc".into() });

        assert_eq!(rx1.recv().await.unwrap().topic(), "block-tx-fetch-failed");
        assert_eq!(rx2.recv().await.unwrap().topic(), "block-tx-fetch-failed");
    }
}
