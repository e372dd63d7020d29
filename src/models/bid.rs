//! Bid records.
//!
//! Append-only: a bid row is never updated in place except the narrow
//! `accepted -> outbid` transition applied when a later bid supersedes it
//! (spec.md §3, invariant 2).

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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bid_outcome", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidOutcome {
    Accepted,
    Outbid,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: Uuid,
    pub auction_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub status: BidOutcome,
    pub previous_high_bid: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}
