//! Registry mapping `auction_id -> broadcast topic`.
//!
//! Built on `tokio::sync::broadcast`, whose ring-buffer semantics already
//! give us exactly what spec.md §4.E asks for: each subscriber keeps its
//! own read cursor into a bounded buffer, and a subscriber that falls more
//! than `capacity` messages behind observes `RecvError::Lagged(n)` on its
//! next `recv` instead of blocking the sender or the other subscribers.
//! That isolates slow consumers from fast ones without the broadcaster
//! having to track per-subscriber drop bookkeeping itself.
//!
//! Reader-writer discipline (spec.md §5): `publish` takes the read lock;
//! only `subscribe`/`unsubscribe` take the write lock, matching the
//! `parking_lot::RwLock` the teacher plugin uses for its own process-wide
//! mutable state (`src/plugin.rs`).

use std::collections::{
    HashMap,
    HashSet,
};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::event::AuctionEvent;

struct Topic {
    sender: broadcast::Sender<AuctionEvent>,
    subscribers: HashSet<Uuid>,
}

pub struct Subscription {
    pub subscriber_id: Uuid,
    pub auction_id: Uuid,
    pub receiver: broadcast::Receiver<AuctionEvent>,
}

pub struct EventBroadcaster {
    topics: RwLock<HashMap<Uuid, Topic>>,
    subscriber_index: RwLock<HashMap<Uuid, Uuid>>,
    buffer: usize,
}

impl EventBroadcaster {
    pub fn new(buffer: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            subscriber_index: RwLock::new(HashMap::new()),
            buffer,
        }
    }

    /// Register a new channel for `auction_id`. Returns immediately.
    pub fn subscribe(&self, auction_id: Uuid) -> Subscription {
        let subscriber_id = Uuid::new_v4();
        let receiver = {
            let mut topics = self.topics.write();
            let topic = topics.entry(auction_id).or_insert_with(|| Topic {
                sender: broadcast::channel(self.buffer).0,
                subscribers: HashSet::new(),
            });
            topic.subscribers.insert(subscriber_id);
            topic.sender.subscribe()
        };
        self.subscriber_index
            .write()
            .insert(subscriber_id, auction_id);
        Subscription {
            subscriber_id,
            auction_id,
            receiver,
        }
    }

    /// Idempotent: a subscriber id that is not (or no longer) registered is
    /// a no-op.
    pub fn unsubscribe(&self, subscriber_id: Uuid) {
        let Some(auction_id) = self.subscriber_index.write().remove(&subscriber_id) else {
            return;
        };
        let mut topics = self.topics.write();
        if let Some(topic) = topics.get_mut(&auction_id) {
            topic.subscribers.remove(&subscriber_id);
            if topic.subscribers.is_empty() {
                topics.remove(&auction_id);
            }
        }
    }

    /// Non-blocking: publish never waits on a slow subscriber. Dropping the
    /// oldest buffered event for a lagging subscriber is handled implicitly
    /// by the broadcast channel's ring buffer.
    pub fn publish(&self, auction_id: Uuid, event: AuctionEvent) {
        let topics = self.topics.read();
        if let Some(topic) = topics.get(&auction_id) {
            // Err(SendError) only means there are currently no receivers;
            // that is not a failure the engine needs to observe (spec.md
            // §7: "the broadcaster never propagates failures back to the
            // engine").
            let _ = topic.sender.send(event);
        }
    }

    pub fn subscriber_count(&self, auction_id: Uuid) -> usize {
        self.topics
            .read()
            .get(&auction_id)
            .map_or(0, |t| t.subscribers.len())
    }

    /// Drained on shutdown: every open subscriber receives a terminal
    /// `ServerClosing` event before the registry is cleared.
    pub fn shutdown(&self) {
        let mut topics = self.topics.write();
        for topic in topics.values() {
            let _ = topic.sender.send(AuctionEvent::ServerClosing);
        }
        topics.clear();
        self.subscriber_index.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn bid_update(auction_id: Uuid) -> AuctionEvent {
        AuctionEvent::BidUpdate {
            auction_id,
            current_bid: Decimal::new(100, 0),
            bid_count: 1,
            bidder_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_is_isolated_per_auction() {
        let broadcaster = EventBroadcaster::new(4);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut sub_a = broadcaster.subscribe(a);
        let mut sub_b = broadcaster.subscribe(b);

        broadcaster.publish(a, bid_update(a));

        assert!(sub_a.receiver.try_recv().is_ok());
        assert!(sub_b.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let broadcaster = EventBroadcaster::new(4);
        let a = Uuid::new_v4();
        let sub = broadcaster.subscribe(a);
        assert_eq!(broadcaster.subscriber_count(a), 1);
        broadcaster.unsubscribe(sub.subscriber_id);
        assert_eq!(broadcaster.subscriber_count(a), 0);
        broadcaster.unsubscribe(sub.subscriber_id);
        assert_eq!(broadcaster.subscriber_count(a), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_observes_lag_without_blocking_sender() {
        let broadcaster = EventBroadcaster::new(2);
        let a = Uuid::new_v4();
        let mut sub = broadcaster.subscribe(a);

        for _ in 0..5 {
            broadcaster.publish(a, bid_update(a));
        }

        match sub.receiver.try_recv() {
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => {}
            other => panic!("expected Lagged, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_emits_terminal_event() {
        let broadcaster = EventBroadcaster::new(4);
        let a = Uuid::new_v4();
        let mut sub = broadcaster.subscribe(a);
        broadcaster.shutdown();
        assert!(matches!(
            sub.receiver.try_recv(),
            Ok(AuctionEvent::ServerClosing)
        ));
    }
}
