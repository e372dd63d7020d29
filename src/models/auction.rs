//! Auction aggregate.
//!
//! Mirrors the `auctions` table of the persisted state layout: identity,
//! status, timing, the denormalized current-bid projection, and the OCC
//! `version` counter. See [`crate::store`] for the compare-and-set
//! operations that keep this row consistent with the `bids` history.

use chrono::{
    DateTime,
    Utc,
};
use rust_decimal::Decimal;
use serde::{
    Deserialize,
    Serialize,
};
use uuid::Uuid;

/// Status transitions form the DAG: scheduled -> active -> ended;
/// scheduled -> cancelled; active -> cancelled. No other transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Scheduled,
    Active,
    Ended,
    Cancelled,
}

impl AuctionStatus {
    pub fn can_transition_to(self, next: AuctionStatus) -> bool {
        matches!(
            (self, next),
            (AuctionStatus::Scheduled, AuctionStatus::Active)
                | (AuctionStatus::Active, AuctionStatus::Ended)
                | (AuctionStatus::Scheduled, AuctionStatus::Cancelled)
                | (AuctionStatus::Active, AuctionStatus::Cancelled)
        )
    }
}

/// Auction row: identity, vehicle reference, status, timing, and the
/// denormalized winning-bid projection.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Auction {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub seller_id: Uuid,
    pub status: AuctionStatus,

    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,

    pub starting_price: Decimal,

    /// Denormalized projection of the accepted-bid timeline. Authoritative
    /// for reads; always co-written with the matching `bids` row inside the
    /// same transaction (see design note in `spec.md` §9).
    pub current_bid: Option<Decimal>,
    pub current_bid_user_id: Option<Uuid>,
    pub bid_count: i32,

    /// Monotone counter bumped by one on every successful OCC update (a bid
    /// accept or an extension).
    pub version: i64,

    pub extension_count: i32,
    pub max_extensions: i32,
    pub snipe_threshold_secs: i32,
    pub extension_step_secs: i32,

    pub winner_id: Option<Uuid>,
    pub winning_bid: Option<Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auction {
    /// Minimum accepted amount for the next bid, absent a configured
    /// increment floor (the increment itself is a Bid Engine config knob,
    /// not a per-auction field — see `AuctionConfig::min_bid_increment`).
    pub fn floor_bid(&self) -> Decimal {
        self.current_bid.unwrap_or(self.starting_price)
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == AuctionStatus::Active && now < self.ends_at
    }

    pub fn should_start(&self, now: DateTime<Utc>) -> bool {
        self.status == AuctionStatus::Scheduled && now >= self.starts_at
    }

    pub fn should_end(&self, now: DateTime<Utc>) -> bool {
        self.status == AuctionStatus::Active && now >= self.ends_at
    }

    /// Anti-snipe eligibility: within `snipe_threshold` of the deadline and
    /// extensions remain.
    pub fn within_snipe_window(&self, now: DateTime<Utc>) -> bool {
        let remaining = (self.ends_at - now).num_seconds();
        remaining >= 0
            && remaining < i64::from(self.snipe_threshold_secs)
            && self.extension_count < self.max_extensions
    }
}
