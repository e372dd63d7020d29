//! Single logical poll loop, shaped after the reference auction scheduler
//! in this corpus (`Scheduler::run` ticking on a `tokio::time::interval`,
//! fanning each due row out to its own task, logging individual failures
//! rather than aborting the tick).

use std::{
    sync::Arc,
    time::Duration,
};

use chrono::Utc;
use tracing::{
    error,
    info,
    instrument,
};
use uuid::Uuid;

use crate::{
    broadcast::EventBroadcaster,
    error::StoreError,
    models::event::AuctionEvent,
    store::AuctionStore,
};

pub struct LifecycleScheduler {
    store: Arc<dyn AuctionStore>,
    broadcaster: Arc<EventBroadcaster>,
    tick_interval: Duration,
    batch_limit: i64,
}

impl LifecycleScheduler {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        broadcaster: Arc<EventBroadcaster>,
        tick_interval: Duration,
        batch_limit: i64,
    ) -> Self {
        Self {
            store,
            broadcaster,
            tick_interval,
            batch_limit,
        }
    }

    /// Runs until the process is torn down. Individual tick failures are
    /// logged and the loop continues — a restart re-scans from scratch, so
    /// there is nothing to recover here beyond observability.
    pub async fn run(&self) {
        // Stagger the first tick across replicas so a fleet restart doesn't
        // send every instance's scan at the database in the same instant.
        let jitter = rand::random::<u64>() % (self.tick_interval.as_millis() as u64).max(1);
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.tick().await {
                error!(error = %e, "scheduler tick failed");
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<(), StoreError> {
        self.start_due_auctions().await?;
        self.close_due_auctions().await?;
        Ok(())
    }

    async fn start_due_auctions(&self) -> Result<(), StoreError> {
        let now = Utc::now();
        let due = self.store.list_auctions_to_start(now, self.batch_limit).await?;
        let mut handles = Vec::with_capacity(due.len());
        for auction in due {
            let store = self.store.clone();
            let broadcaster = self.broadcaster.clone();
            handles.push(tokio::spawn(async move {
                start_one(store.as_ref(), broadcaster.as_ref(), auction.id).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }

    async fn close_due_auctions(&self) -> Result<(), StoreError> {
        let now = Utc::now();
        let due = self.store.list_auctions_to_end(now, self.batch_limit).await?;
        let mut handles = Vec::with_capacity(due.len());
        for auction in due {
            let store = self.store.clone();
            let broadcaster = self.broadcaster.clone();
            handles.push(tokio::spawn(async move {
                close_one(store.as_ref(), broadcaster.as_ref(), auction.id).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }
}

async fn start_one(store: &dyn AuctionStore, broadcaster: &EventBroadcaster, auction_id: Uuid) {
    match store.mark_started(auction_id).await {
        Ok(Some(started)) => {
            info!(auction_id = %auction_id, "auction started");
            broadcaster.publish(
                auction_id,
                AuctionEvent::AuctionStarted {
                    auction_id,
                    starts_at: started.starts_at,
                },
            );
        }
        Ok(None) => {
            // Already active — another tick or process won the race, or it
            // was cancelled in the meantime. Idempotent no-op.
        }
        Err(e) => error!(auction_id = %auction_id, error = %e, "failed to start auction"),
    }
}

/// Close Pipeline (spec.md §4.C): re-check the deadline (a late extension
/// may have moved it), transition to `ended` with the winner fields
/// materialized, and publish the terminal event. The outbox row for
/// downstream order-creation handoff is written by the store in the same
/// transaction as the status flip.
async fn close_one(store: &dyn AuctionStore, broadcaster: &EventBroadcaster, auction_id: Uuid) {
    let auction = match store.load(auction_id).await {
        Ok(auction) => auction,
        Err(e) => {
            error!(auction_id = %auction_id, error = %e, "failed to reload auction before close");
            return;
        }
    };

    if auction.ends_at > Utc::now() {
        // A late anti-snipe extension pushed the deadline out after this
        // auction was selected as due; skip it this tick.
        return;
    }

    match store.mark_ended(auction_id).await {
        Ok(Some(ended)) => {
            info!(
                auction_id = %auction_id,
                winner_id = ?ended.winner_id,
                winning_bid = ?ended.winning_bid,
                "auction ended"
            );
            broadcaster.publish(
                auction_id,
                AuctionEvent::AuctionEnded {
                    auction_id,
                    winner_id: ended.winner_id,
                    winning_bid: ended.winning_bid,
                },
            );
        }
        Ok(None) => {
            // Already ended by a racing tick/process. Idempotent no-op —
            // crucially, we do not re-publish AuctionEnded (testable
            // property 7: no duplicate events per commit).
        }
        Err(e) => error!(auction_id = %auction_id, error = %e, "failed to close auction"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        models::auction::{
            Auction,
            AuctionStatus,
        },
        store::InMemoryAuctionStore,
    };

    fn base_auction(status: AuctionStatus, starts_at: chrono::DateTime<Utc>, ends_at: chrono::DateTime<Utc>) -> Auction {
        let now = Utc::now();
        Auction {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            status,
            starts_at,
            ends_at,
            starting_price: dec!(1000),
            current_bid: Some(dec!(57000)),
            current_bid_user_id: Some(Uuid::new_v4()),
            bid_count: 3,
            version: 3,
            extension_count: 0,
            max_extensions: 10,
            snipe_threshold_secs: 120,
            extension_step_secs: 120,
            winner_id: None,
            winning_bid: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn s6_close_pipeline_materializes_winner_once() {
        let store = Arc::new(InMemoryAuctionStore::new());
        let auction = base_auction(
            AuctionStatus::Active,
            Utc::now() - Duration::hours(1),
            Utc::now() - Duration::seconds(1),
        );
        let auction_id = auction.id;
        let expected_winner = auction.current_bid_user_id;
        let expected_bid = auction.current_bid;
        store.insert(auction);
        let broadcaster = Arc::new(EventBroadcaster::new(8));
        let mut sub = broadcaster.subscribe(auction_id);

        close_one(store.as_ref(), broadcaster.as_ref(), auction_id).await;

        let ended = store.snapshot(auction_id).unwrap();
        assert_eq!(ended.status, AuctionStatus::Ended);
        assert_eq!(ended.winner_id, expected_winner);
        assert_eq!(ended.winning_bid, expected_bid);
        assert_eq!(store.outbox_len(), 1);

        match sub.receiver.try_recv() {
            Ok(AuctionEvent::AuctionEnded {
                winner_id, ..
            }) => assert_eq!(winner_id, expected_winner),
            other => panic!("expected AuctionEnded, got {other:?}"),
        }

        // Idempotent: running the pipeline again does not re-publish.
        close_one(store.as_ref(), broadcaster.as_ref(), auction_id).await;
        assert!(matches!(
            sub.receiver.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn late_extension_skips_close_this_tick() {
        let store = Arc::new(InMemoryAuctionStore::new());
        let mut auction = base_auction(
            AuctionStatus::Active,
            Utc::now() - Duration::hours(1),
            Utc::now() - Duration::seconds(5),
        );
        // Simulate a race: an extension lands between selection and close.
        auction.ends_at = Utc::now() + Duration::minutes(2);
        let auction_id = auction.id;
        store.insert(auction);
        let broadcaster = Arc::new(EventBroadcaster::new(8));

        close_one(store.as_ref(), broadcaster.as_ref(), auction_id).await;

        assert_eq!(store.snapshot(auction_id).unwrap().status, AuctionStatus::Active);
    }

    #[tokio::test]
    async fn scheduler_tick_starts_and_ends_due_auctions() {
        let store = Arc::new(InMemoryAuctionStore::new());
        let starting = base_auction(
            AuctionStatus::Scheduled,
            Utc::now() - Duration::seconds(1),
            Utc::now() + Duration::hours(1),
        );
        let ending = base_auction(
            AuctionStatus::Active,
            Utc::now() - Duration::hours(2),
            Utc::now() - Duration::seconds(1),
        );
        let starting_id = starting.id;
        let ending_id = ending.id;
        store.insert(starting);
        store.insert(ending);

        let broadcaster = Arc::new(EventBroadcaster::new(8));
        let scheduler =
            LifecycleScheduler::new(store.clone(), broadcaster, StdDuration::from_millis(50), 100);

        scheduler.tick().await.unwrap();

        assert_eq!(store.snapshot(starting_id).unwrap().status, AuctionStatus::Active);
        assert_eq!(store.snapshot(ending_id).unwrap().status, AuctionStatus::Ended);
    }
}
