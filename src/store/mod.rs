//! Auction Store (spec.md §4.A): the durable, transactional home for
//! auctions and bids, and the OCC primitives the rest of the crate builds
//! on.
//!
//! [`AuctionStore`] is a trait so the Bid Engine can be unit-tested against
//! [`memory::InMemoryAuctionStore`] without a database, while production
//! runs against [`postgres::PgAuctionStore`].

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{
    DateTime,
    Utc,
};
use rust_decimal::Decimal;
use uuid::Uuid;

pub use memory::InMemoryAuctionStore;
pub use postgres::PgAuctionStore;

use crate::{
    error::StoreError,
    models::{
        auction::Auction,
        bid::Bid,
    },
};

/// Result of a successful bid commit: the post-commit auction row and the
/// id assigned to the newly accepted bid.
#[derive(Debug, Clone)]
pub struct BidCommit {
    pub auction: Auction,
    pub bid_id: Uuid,
}

#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// Load the current row, or `NotFound`.
    async fn load(&self, auction_id: Uuid) -> Result<Auction, StoreError>;

    /// Atomically: bump `version` and `bid_count`, set the denormalized
    /// current-bid projection, insert the new `accepted` bid row (with
    /// `previous_high_bid` recorded from the caller's snapshot), and flip
    /// any other user's prior `accepted` bid on this auction to `outbid`.
    /// Fails `VersionConflict` if `expected_version` is stale.
    async fn compare_and_set_bid(
        &self,
        auction_id: Uuid,
        user_id: Uuid,
        new_amount: Decimal,
        previous_high_bid: Option<Decimal>,
        expected_version: i64,
    ) -> Result<BidCommit, StoreError>;

    /// Persist a `rejected` bid row. Used on the losing side of a detected
    /// race (spec.md §4.B commit path, `VersionConflict` branch).
    async fn insert_rejected_bid(
        &self,
        auction_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        previous_high_bid: Option<Decimal>,
    ) -> Result<(), StoreError>;

    /// Atomically: `ends_at += extension_step`, `extension_count += 1`,
    /// `version += 1`. Guarded by `extension_count < max_extensions`.
    async fn compare_and_set_extension(
        &self,
        auction_id: Uuid,
        expected_version: i64,
        extension_step_secs: i32,
    ) -> Result<Auction, StoreError>;

    async fn list_auctions_to_start(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Auction>, StoreError>;

    async fn list_auctions_to_end(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Auction>, StoreError>;

    /// Idempotent `scheduled -> active` transition.
    async fn mark_started(&self, auction_id: Uuid) -> Result<Option<Auction>, StoreError>;

    /// Idempotent close: sets status, `winner_id`, `winning_bid`. Returns
    /// `None` if the auction was already `ended` (idempotent no-op) so the
    /// scheduler does not double-publish `AuctionEnded`. Also enqueues the
    /// at-least-once outbox handoff in the same transaction.
    async fn mark_ended(&self, auction_id: Uuid) -> Result<Option<Auction>, StoreError>;

    async fn bid_history(&self, auction_id: Uuid) -> Result<Vec<Bid>, StoreError>;

    /// Mark an outbox row delivered (SPEC_FULL.md §15). The outbox itself is
    /// at-least-once: downstream consumers dedupe on `id`, and this call is
    /// idempotent from the store's point of view.
    async fn mark_delivered(&self, outbox_id: i64) -> Result<(), StoreError>;
}
