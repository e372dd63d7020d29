//! In-memory [`AuctionStore`] used by engine/scheduler unit tests and the
//! property tests in `tests/`. A real second implementor of the trait
//! (not a mock) so the OCC loop and the close pipeline exercise the same
//! code path they run against Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{
    DateTime,
    Utc,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    AuctionStore,
    BidCommit,
};
use crate::{
    error::StoreError,
    models::{
        auction::{
            Auction,
            AuctionStatus,
        },
        bid::{
            Bid,
            BidOutcome,
        },
    },
};

#[derive(Default)]
struct Inner {
    auctions: HashMap<Uuid, Auction>,
    bids: HashMap<Uuid, Vec<Bid>>,
    outbox: Vec<bool>,
}

pub struct InMemoryAuctionStore {
    inner: Mutex<Inner>,
}

impl InMemoryAuctionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn insert(&self, auction: Auction) {
        let mut inner = self.inner.lock();
        inner.bids.entry(auction.id).or_default();
        inner.auctions.insert(auction.id, auction);
    }

    pub fn snapshot(&self, auction_id: Uuid) -> Option<Auction> {
        self.inner.lock().auctions.get(&auction_id).cloned()
    }

    pub fn outbox_len(&self) -> usize {
        self.inner.lock().outbox.len()
    }
}

impl Default for InMemoryAuctionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuctionStore for InMemoryAuctionStore {
    async fn load(&self, auction_id: Uuid) -> Result<Auction, StoreError> {
        self.inner
            .lock()
            .auctions
            .get(&auction_id)
            .cloned()
            .ok_or(StoreError::NotFound(auction_id))
    }

    async fn compare_and_set_bid(
        &self,
        auction_id: Uuid,
        user_id: Uuid,
        new_amount: Decimal,
        previous_high_bid: Option<Decimal>,
        expected_version: i64,
    ) -> Result<BidCommit, StoreError> {
        let mut inner = self.inner.lock();
        let auction = inner
            .auctions
            .get_mut(&auction_id)
            .ok_or(StoreError::NotFound(auction_id))?;

        if auction.version != expected_version {
            return Err(StoreError::VersionConflict(auction_id));
        }

        auction.current_bid = Some(new_amount);
        auction.current_bid_user_id = Some(user_id);
        auction.bid_count += 1;
        auction.version += 1;
        auction.updated_at = Utc::now();

        let bid_id = Uuid::now_v7();
        let bids = inner.bids.entry(auction_id).or_default();
        for existing in bids.iter_mut() {
            if existing.status == BidOutcome::Accepted && existing.user_id != user_id {
                existing.status = BidOutcome::Outbid;
            }
        }
        bids.push(Bid {
            id: bid_id,
            auction_id,
            user_id,
            amount: new_amount,
            status: BidOutcome::Accepted,
            previous_high_bid,
            created_at: Utc::now(),
        });

        Ok(BidCommit {
            auction: inner.auctions.get(&auction_id).unwrap().clone(),
            bid_id,
        })
    }

    async fn insert_rejected_bid(
        &self,
        auction_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        previous_high_bid: Option<Decimal>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.bids.entry(auction_id).or_default().push(Bid {
            id: Uuid::now_v7(),
            auction_id,
            user_id,
            amount,
            status: BidOutcome::Rejected,
            previous_high_bid,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn compare_and_set_extension(
        &self,
        auction_id: Uuid,
        expected_version: i64,
        extension_step_secs: i32,
    ) -> Result<Auction, StoreError> {
        let mut inner = self.inner.lock();
        let auction = inner
            .auctions
            .get_mut(&auction_id)
            .ok_or(StoreError::NotFound(auction_id))?;

        if auction.version != expected_version {
            return Err(StoreError::VersionConflict(auction_id));
        }
        if auction.extension_count >= auction.max_extensions {
            return Err(StoreError::ExtensionExhausted(auction_id));
        }

        auction.ends_at += chrono::Duration::seconds(i64::from(extension_step_secs));
        auction.extension_count += 1;
        auction.version += 1;
        auction.updated_at = Utc::now();
        Ok(auction.clone())
    }

    async fn list_auctions_to_start(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Auction>, StoreError> {
        let inner = self.inner.lock();
        let mut due: Vec<Auction> = inner
            .auctions
            .values()
            .filter(|a| a.should_start(now))
            .cloned()
            .collect();
        due.sort_by_key(|a| a.starts_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn list_auctions_to_end(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Auction>, StoreError> {
        let inner = self.inner.lock();
        let mut due: Vec<Auction> = inner
            .auctions
            .values()
            .filter(|a| a.should_end(now))
            .cloned()
            .collect();
        due.sort_by_key(|a| a.ends_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn mark_started(&self, auction_id: Uuid) -> Result<Option<Auction>, StoreError> {
        let mut inner = self.inner.lock();
        let auction = inner
            .auctions
            .get_mut(&auction_id)
            .ok_or(StoreError::NotFound(auction_id))?;
        if auction.status != AuctionStatus::Scheduled {
            return Ok(None);
        }
        auction.status = AuctionStatus::Active;
        auction.updated_at = Utc::now();
        Ok(Some(auction.clone()))
    }

    async fn mark_ended(&self, auction_id: Uuid) -> Result<Option<Auction>, StoreError> {
        let mut inner = self.inner.lock();
        let auction = inner
            .auctions
            .get_mut(&auction_id)
            .ok_or(StoreError::NotFound(auction_id))?;
        if auction.status != AuctionStatus::Active {
            return Ok(None);
        }
        auction.status = AuctionStatus::Ended;
        auction.winner_id = auction.current_bid_user_id;
        auction.winning_bid = auction.current_bid;
        auction.updated_at = Utc::now();
        let snapshot = auction.clone();
        inner.outbox.push(false);
        Ok(Some(snapshot))
    }

    async fn bid_history(&self, auction_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        let inner = self.inner.lock();
        let mut accepted: Vec<Bid> = inner
            .bids
            .get(&auction_id)
            .into_iter()
            .flatten()
            .filter(|b| b.status == BidOutcome::Accepted)
            .cloned()
            .collect();
        accepted.sort_by(|a, b| b.amount.cmp(&a.amount));
        Ok(accepted)
    }

    async fn mark_delivered(&self, outbox_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if let Some(delivered) = outbox_id
            .try_into()
            .ok()
            .and_then(|idx: usize| inner.outbox.get_mut(idx))
        {
            *delivered = true;
        }
        Ok(())
    }
}
